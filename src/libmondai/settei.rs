use crate::libmondai::ai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use log::{debug, warn};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;

pub const API_KEY_ENV: &str = "API_KEY_QWEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ai_config: AiConfigJson,
}

#[derive(Debug, Default, Deserialize)]
struct AiConfigJson {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl AiSettings {
    pub fn load(path: &Path) -> AiSettings {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Reads the config file, taking the credential from `env` whenever the
    /// file cannot supply one.
    pub fn load_with(path: &Path, env: impl FnOnce(&str) -> Option<String>) -> AiSettings {
        let config = match read_config(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("[Config] Cannot use {:?}: {}", path, err);
                ConfigFile::default()
            }
        };
        let ai = config.ai_config;

        let api_key = match ai.api_key.filter(|key| !key.is_empty()) {
            Some(key) => key,
            None => {
                debug!("[Config] No api_key in config, falling back to ${}", API_KEY_ENV);
                env(API_KEY_ENV).unwrap_or_default()
            }
        };

        AiSettings {
            api_key,
            model: ai.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: ai.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: ai.timeout_secs.map(Duration::from_secs),
        }
    }
}

fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
