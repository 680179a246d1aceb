// src/config.rs
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MODEL_PATH: &str = "models/best_plant_model.json";
pub const DEFAULT_SECRETS_DIR: &str = "/run/secrets";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
pub const GROQ_API_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub model_path: PathBuf,
    pub secrets_dir: PathBuf,
    pub env_file: PathBuf,
    pub session_ttl: Duration,
    pub advisor_base_url: String,
    pub advisor_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            model_path: DEFAULT_MODEL_PATH.into(),
            secrets_dir: DEFAULT_SECRETS_DIR.into(),
            env_file: DEFAULT_ENV_FILE.into(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            advisor_base_url: GROQ_API_BASE_URL.to_string(),
            advisor_model: GROQ_DEFAULT_MODEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Path of the dotenv file: `LEAF_DOCTOR_ENV_FILE`, else `.env` in the
    /// working directory. Parent directories are never searched.
    pub fn env_file_from<F>(lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("LEAF_DOCTOR_ENV_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| DEFAULT_ENV_FILE.into())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("LEAF_DOCTOR_ADDR") {
            config.addr = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "LEAF_DOCTOR_ADDR",
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("LEAF_DOCTOR_MODEL_PATH") {
            config.model_path = v.into();
        }
        if let Some(v) = get("LEAF_DOCTOR_SECRETS_DIR") {
            config.secrets_dir = v.into();
        }
        config.env_file = Self::env_file_from(&lookup);
        if let Some(v) = get("LEAF_DOCTOR_SESSION_TTL_SECS") {
            let secs: u64 = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "LEAF_DOCTOR_SESSION_TTL_SECS",
                value: v.clone(),
            })?;
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = get("GROQ_BASE_URL") {
            config.advisor_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("GROQ_MODEL") {
            config.advisor_model = v;
        }

        Ok(config)
    }
}
