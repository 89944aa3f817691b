use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ClientConfig;
use crate::application::OrchestratorSettings;
use crate::domain::AppError;

const APP_DIR: &str = "444radio-bridge";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    pub product_name: String,
    pub plugin_url: String,
    /// Overrides `<documents>/<product>/Downloads` when set.
    pub downloads_dir: Option<PathBuf>,
    pub fallback_name: String,
    pub connect_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            product_name: "444Radio".to_string(),
            plugin_url: "https://444radio.co.in/plugin".to_string(),
            downloads_dir: None,
            fallback_name: "444radio-generation".to_string(),
            connect_timeout_secs: 30,
            shutdown_timeout_secs: 15,
            user_agent: ClientConfig::default().user_agent,
        }
    }
}

impl PluginConfig {
    pub fn load() -> Result<Self, AppError> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
        } else {
            let config = PluginConfig::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => {
                log::info!("Configuration loaded successfully");
                config
            }
            Err(e) => {
                log::error!("Failed to load configuration: {}", e);
                PluginConfig::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let config_path = Self::config_path()?;
        if let Some(config_dir) = config_path.parent() {
            std::fs::create_dir_all(config_dir)?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn app_dir() -> Result<PathBuf, AppError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))
    }

    fn config_path() -> Result<PathBuf, AppError> {
        Ok(Self::app_dir()?.join("config.json"))
    }

    /// Where the standalone shell keeps the session blob.
    pub fn session_path() -> Result<PathBuf, AppError> {
        Ok(Self::app_dir()?.join("session.json"))
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.downloads_dir.clone().unwrap_or_else(|| {
            dirs::document_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(&self.product_name)
                .join("Downloads")
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            downloads_dir: self.downloads_dir(),
            fallback_name: self.fallback_name.clone(),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
        }
    }
}
