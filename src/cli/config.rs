use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ApiClient;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Persisted CLI session, stored as `env.json` in the config directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub session: Option<SessionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub logged_in_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EnvironmentConfig {
    /// `PAWCARE_SERVER_URL` wins over the saved URL
    pub fn server_url(&self) -> String {
        std::env::var("PAWCARE_SERVER_URL")
            .ok()
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn is_expired(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.expires_at <= Utc::now())
    }

    /// API client for the configured server, carrying the saved token
    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let token = if self.is_expired() { None } else { self.token.clone() };
        Ok(ApiClient::new(self.server_url())?.with_token(token))
    }

    pub fn clear_session(&mut self) {
        self.token = None;
        self.session = None;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("PAWCARE_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("pawcare").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.json");

    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }

    let content = fs::read_to_string(env_file)?;
    let config: EnvironmentConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.json");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(env_file, content)?;
    Ok(())
}
