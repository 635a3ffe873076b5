use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Posts document store
    pub store_project: String,
    pub store_token: String,
    pub store_branch: String,
    pub store_file_path: String,
    pub archive_file_path: String,
    pub gitlab_base_url: String,

    // Scheduler
    pub poll_interval: Duration,

    // Health server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Posts document store
            store_project: required_env("STORE_PROJECT")?,
            store_token: required_env("STORE_TOKEN")?,
            store_branch: env_or_default("STORE_BRANCH", "main"),
            store_file_path: env_or_default("STORE_FILE_PATH", "posts.json"),
            archive_file_path: env_or_default("ARCHIVE_FILE_PATH", "archive.json"),
            gitlab_base_url: env_or_default("GITLAB_BASE_URL", "https://gitlab.com"),

            // Scheduler
            poll_interval: Duration::from_millis(parse_env_u64("POLL_INTERVAL_MS", 15_000)?),

            // Health server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_project.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "STORE_PROJECT".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.store_token.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "STORE_TOKEN".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "POLL_INTERVAL_MS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if url::Url::parse(&self.gitlab_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "GITLAB_BASE_URL".to_string(),
                message: format!("not a valid URL: {}", self.gitlab_base_url),
            });
        }
        Ok(())
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
