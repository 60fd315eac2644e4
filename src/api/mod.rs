//! Request pipeline shared by every entity screen.
//!
//! Builds the request (path, query, body, headers), injects the bearer token
//! from the session's token store and classifies the response into either a
//! parsed body or an [`ApiError`]. Every call is a single attempt: no retry,
//! no timeout, no backoff.

pub mod response;

use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ConfigError};
use crate::session::store::TokenStore;

/// Outgoing request body
pub enum RequestBody {
    /// Serialized as JSON
    Json(Value),
    /// Sent unmodified; the runtime picks the content type and boundary
    Multipart(Form),
    /// Sent as-is
    Raw(String),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<Form> for RequestBody {
    fn from(form: Form) -> Self {
        RequestBody::Multipart(form)
    }
}

impl From<String> for RequestBody {
    fn from(raw: String) -> Self {
        RequestBody::Raw(raw)
    }
}

/// Per-request options
#[derive(Default)]
pub struct RequestOptions {
    pub query: Vec<(String, Option<String>)>,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
    pub skip_json_content_type: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter; `None` values are left out of the URL
    pub fn query<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        self.query.push((key.to_string(), value.map(|v| v.to_string())));
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Do not add `Content-Type: application/json`
    pub fn skip_json_content_type(mut self) -> Self {
        self.skip_json_content_type = true;
        self
    }
}

/// Append non-null query pairs to `base + path`
pub fn build_url(base: &str, path: &str, query: &[(String, Option<String>)]) -> String {
    let mut url = format!("{}{}", base.trim_end_matches('/'), path);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in query {
        if let Some(value) = value {
            serializer.append_pair(key, value);
            any = true;
        }
    }

    if any {
        let qs = serializer.finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&qs);
    }

    url
}

/// HTTP client bound to one backend and one token store
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base URL".to_string(),
            });
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, read fresh from the store on every request
    pub fn token(&self) -> Option<String> {
        self.tokens.current()
    }

    /// Send one request and classify the response
    pub async fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let url = build_url(&self.base_url, path, &options.query);
        let token = self.token();

        let is_multipart = matches!(options.body, Some(RequestBody::Multipart(_)));
        let has_content_type = options
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));

        let mut builder = self.http.request(method.clone(), &url);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        if !is_multipart && !has_content_type && !options.skip_json_content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json");
        }

        builder = match options.body {
            Some(RequestBody::Json(value)) => builder.body(value.to_string()),
            Some(RequestBody::Multipart(form)) => builder.multipart(form),
            Some(RequestBody::Raw(raw)) => builder.body(raw),
            None => builder,
        };

        tracing::debug!(%method, %url, authenticated = token.is_some(), "dispatching request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%method, %url, error = %e, "transport failure");
                return Err(ApiError::from(e));
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        tracing::debug!(%method, %url, status = status.as_u16(), "response received");

        let bytes = response.bytes().await.ok();
        response::classify(status, &headers, bytes.as_deref())
    }

    /// Send one request and deserialize a successful body into `T`
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.request(method, path, options).await?;
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::decode(format!("unexpected response from {path}: {e}"), value))
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::GET, path, options).await
    }

    pub async fn post(&self, path: &str, body: impl Into<RequestBody>, options: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::POST, path, options.body(body)).await
    }

    pub async fn put(&self, path: &str, body: impl Into<RequestBody>, options: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, options.body(body)).await
    }

    pub async fn patch(&self, path: &str, body: impl Into<RequestBody>, options: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::PATCH, path, options.body(body)).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, options).await
    }

    /// POST a multipart form without the JSON content type
    pub async fn upload(&self, path: &str, form: Form, options: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::POST, path, options.body(form).skip_json_content_type())
            .await
    }
}
