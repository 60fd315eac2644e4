// Client error types
use serde_json::Value;
use thiserror::Error;

static NULL_BODY: Value = Value::Null;

/// Failure signal raised by the request pipeline.
///
/// Every variant answers the same questions (`message`, `status_code`, `body`,
/// `headers`) so call sites can report a failure without caring whether the
/// backend answered at all.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, TLS, ...)
    #[error("{message}")]
    Transport { message: String },

    /// The backend answered with a non-success status
    #[error("{message}")]
    Http {
        message: String,
        status: u16,
        body: Value,
        headers: Vec<(String, String)>,
    },

    /// A success body did not have the expected shape
    #[error("{message}")]
    Decode { message: String, body: Value },
}

impl ApiError {
    /// HTTP status code, `0` when no response status applies
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Transport { .. } | ApiError::Decode { .. } => 0,
        }
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Transport { message } => message,
            ApiError::Http { message, .. } => message,
            ApiError::Decode { message, .. } => message,
        }
    }

    /// Parsed response body, `Value::Null` for transport failures
    pub fn body(&self) -> &Value {
        match self {
            ApiError::Transport { .. } => &NULL_BODY,
            ApiError::Http { body, .. } => body,
            ApiError::Decode { body, .. } => body,
        }
    }

    /// Raw response headers in arrival order
    pub fn headers(&self) -> &[(String, String)] {
        match self {
            ApiError::Http { headers, .. } => headers,
            _ => &[],
        }
    }

    /// The backend's `detail` string when it sent one, otherwise the message.
    /// This is what error lines and alerts show to the user.
    pub fn display_detail(&self) -> String {
        match self.body().get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
            _ => self.message().to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ApiError::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>, body: Value) -> Self {
        ApiError::Decode {
            message: message.into(),
            body,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if message.is_empty() {
            ApiError::transport("Network error")
        } else {
            ApiError::transport(message)
        }
    }
}

/// Failures of the session layer (login, token persistence)
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Token not returned by server")]
    TokenMissing,

    #[error("{0}")]
    Validation(String),

    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HOME environment variable not set")]
    NoHome,

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid view rules: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}
