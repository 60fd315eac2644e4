use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub views: ViewsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub login_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// YAML rules replacing the built-in admin console rules
    pub rules_file: Option<PathBuf>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("CAMPUS_API_URL") {
            if !v.trim().is_empty() {
                self.api.base_url = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("CAMPUS_LOGIN_PATH") {
            if !v.trim().is_empty() {
                self.api.login_path = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("CAMPUS_VIEWS_FILE") {
            self.views.rules_file = if v.trim().is_empty() { None } else { Some(PathBuf::from(v.trim())) };
        }

        self
    }

    fn defaults() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                login_path: "/users/login".to_string(),
            },
            views: ViewsConfig { rules_file: None },
        }
    }
}

// Global singleton config - initialized once on first use
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

pub fn config() -> &'static ClientConfig {
    &CONFIG
}
