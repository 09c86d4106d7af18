//! Application Configuration Module
//!
//! Loads the service settings from the environment (and a `.env` file when
//! present) into a single struct.

use std::env;

use interview_realtime::FinalAudioPolicy;
use tracing::Level;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub log_level: Level,
    pub input_device: Option<String>,
    pub final_audio: FinalAudioPolicy,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `INTERVIEW_API_URL`: (Optional) Base URL of the interview server. Defaults to "http://localhost:8000".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    // *   `INPUT_DEVICE`: (Optional) Name of the microphone to record from. Defaults to the system default.
    // *   `FINAL_AUDIO`: (Optional) "finish" or "abandon" the closing remarks when the interviewer ends the session.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("INTERVIEW_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let input_device = lookup("INPUT_DEVICE").filter(|name| !name.trim().is_empty());

        let final_audio = match lookup("FINAL_AUDIO") {
            Some(value) => value
                .parse::<FinalAudioPolicy>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "FINAL_AUDIO",
                    value,
                })?,
            None => FinalAudioPolicy::default(),
        };

        Ok(Self {
            api_url,
            log_level,
            input_device,
            final_audio,
        })
    }
}
