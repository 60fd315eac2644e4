use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::store::{FileTokenStore, TOKEN_KEY};

/// Persisted CLI settings (`settings.json` in the config directory)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliSettings {
    /// Backend URL overriding `CAMPUS_API_URL`
    pub base_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CliSettings {
    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self.updated_at = Some(Utc::now());
    }

    /// Stored URL, else the environment/default one
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| crate::config::config().api.base_url.clone())
    }
}

pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CAMPUS_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
        PathBuf::from(home).join(".config").join("campus").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_settings() -> Result<CliSettings, ConfigError> {
    let settings_file = get_config_dir()?.join("settings.json");

    if !settings_file.exists() {
        return Ok(CliSettings::default());
    }

    let content = fs::read_to_string(settings_file)?;
    let settings: CliSettings = serde_json::from_str(&content)?;
    Ok(settings)
}

pub fn save_settings(settings: &CliSettings) -> Result<(), ConfigError> {
    let settings_file = get_config_dir()?.join("settings.json");

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(settings_file, content)?;
    Ok(())
}

/// Token file shared by every command
pub fn token_store() -> Result<FileTokenStore, ConfigError> {
    Ok(FileTokenStore::new(get_config_dir()?.join(TOKEN_KEY)))
}
