//! Configuration management for the rental server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::rental::workflow::DEFAULT_MAX_PHOTO_BYTES;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
    /// When set, logs are also written to daily-rolling files here
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RentalsConfig {
    pub max_photo_bytes: usize,
    pub seed_sample_catalog: bool,
    /// Idle sessions are evicted after this many seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    /// Store requests in this process
    Local,
    /// Forward requests to an external rental service
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    pub mode: SubmissionMode,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rentals: RentalsConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix SAMUDAY_), e.g. SAMUDAY_SERVER__PORT
            .add_source(
                Environment::with_prefix("SAMUDAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Override the submission endpoint from RENTAL_SERVICE_URL if present
            .set_override_option("submission.endpoint", env::var("RENTAL_SERVICE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Default for RentalsConfig {
    fn default() -> Self {
        Self {
            max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
            seed_sample_catalog: true,
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            mode: SubmissionMode::Local,
            endpoint: None,
            timeout_secs: 30,
        }
    }
}
