use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;

use crate::api::{ApiClient, RequestOptions};
use crate::config::ClientConfig;
use crate::error::{ConfigError, SessionError};
use crate::models::User;
use crate::session::roles::{compute_role_set, RoleCatalog, RoleSet};
use crate::session::store::TokenStore;
use crate::session::user::CurrentUser;
use crate::session::Session;
use crate::views::{ViewRules, VisibilityMap};

const ROLES_PATH: &str = "/roles/";

/// Everything a view needs: the HTTP client, the token lifecycle and the
/// role catalog cache. Cloning shares the same cache.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    session: Session,
    login_path: String,
    catalog: RwLock<Option<Arc<RoleCatalog>>>,
}

impl SessionContext {
    pub fn new(api: ApiClient, session: Session, login_path: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                session,
                login_path: login_path.into(),
                catalog: RwLock::new(None),
            }),
        }
    }

    /// Build a client and session sharing one token store
    pub fn connect(base_url: &str, login_path: &str, store: Arc<dyn TokenStore>) -> Result<Self, ConfigError> {
        let api = ApiClient::new(base_url, store.clone())?;
        let session = Session::new(store);
        Ok(Self::new(api, session, login_path))
    }

    pub fn from_config(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self, ConfigError> {
        Self::connect(&config.api.base_url, &config.api.login_path, store)
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Exchange credentials for a token and persist it.
    ///
    /// The token is looked up under `access_token`, `token`,
    /// `data.access_token` and `accessToken`, in that order.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, SessionError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::Validation(
                "username and password are required".to_string(),
            ));
        }

        let body = json!({ "username": username, "password": password });
        let response = self
            .inner
            .api
            .post(&self.inner.login_path, body, RequestOptions::new())
            .await?;

        let token = ["/access_token", "/token", "/data/access_token", "/accessToken"]
            .iter()
            .find_map(|pointer| response.pointer(pointer).and_then(|v| v.as_str()))
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::TokenMissing)?
            .to_string();

        self.inner.session.save(Some(&token))?;
        self.invalidate().await;
        tracing::info!(%username, "logged in");
        Ok(token)
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.inner.session.logout()?;
        self.invalidate().await;
        Ok(())
    }

    /// Role catalog, fetched on first use and kept until [`invalidate`].
    /// A failed fetch caches an empty catalog.
    ///
    /// [`invalidate`]: SessionContext::invalidate
    pub async fn role_catalog(&self) -> Arc<RoleCatalog> {
        let cached = self.inner.catalog.read().await.clone();
        match cached {
            Some(catalog) => catalog,
            None => self.refresh_roles().await,
        }
    }

    /// Fetch the catalog now and replace the cached one
    pub async fn refresh_roles(&self) -> Arc<RoleCatalog> {
        let catalog = match self.inner.api.get(ROLES_PATH, RequestOptions::new()).await {
            Ok(body) => RoleCatalog::from_response(&body),
            Err(e) => {
                tracing::warn!(error = %e, "role catalog unavailable");
                RoleCatalog::default()
            }
        };
        tracing::debug!(roles = catalog.roles().len(), "role catalog loaded");

        let catalog = Arc::new(catalog);
        *self.inner.catalog.write().await = Some(catalog.clone());
        catalog
    }

    /// Drop the cached catalog; the next lookup fetches again
    pub async fn invalidate(&self) {
        *self.inner.catalog.write().await = None;
    }

    /// `GET /users/{id}` for the token's user. Any failure yields `None`.
    pub async fn fetch_profile(&self) -> Option<User> {
        let id = self.inner.session.current_user()?.numeric_id()?;
        match self
            .inner
            .api
            .request_as::<User>(reqwest::Method::GET, &format!("/users/{id}"), RequestOptions::new())
            .await
        {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "profile fetch failed, using token claims");
                None
            }
        }
    }

    /// Claims-derived user refined by the backend profile when reachable
    pub async fn user_info(&self) -> Option<CurrentUser> {
        let mut user = self.inner.session.current_user();
        if let Some(profile) = self.fetch_profile().await {
            user.get_or_insert_with(CurrentUser::default).merge_profile(&profile);
        }
        user
    }

    /// Role set of the current user, empty when signed out
    pub async fn role_set(&self) -> RoleSet {
        if !self.inner.session.is_authenticated() {
            return RoleSet::new();
        }
        let user = self.user_info().await;
        let catalog = self.role_catalog().await;
        compute_role_set(user.as_ref(), &catalog)
    }

    /// Evaluate `rules` for the current session
    pub async fn visibility(&self, rules: &ViewRules) -> VisibilityMap {
        let authenticated = self.inner.session.is_authenticated();
        let roles = self.role_set().await;
        rules.evaluate(authenticated, &roles)
    }
}
