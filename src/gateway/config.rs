use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::gateway::backend::ConverterBackend;
use crate::gateway::errors::{ConfigurationError, GatewayResult};
use crate::gateway::http_client::{DEFAULT_USER_AGENT, FetchOptions};
use crate::gateway::rules::NodeKind;

/// Main configuration structure for the conversion gateway
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Conversion engine selection
    pub converter: ConverterConfig,
    /// Defaults for fetching HTML by URL
    pub fetch: FetchConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Configuration for the conversion engine
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ConverterConfig {
    /// Preferred engine; the builtin converter is used when it is unavailable
    pub backend: ConverterBackend,
    /// Extra tags for the builtin converter, e.g. `section: div`
    pub tag_aliases: BTreeMap<String, NodeKind>,
}

/// Configuration for URL fetching
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    /// Timeout of the full GET request in seconds
    pub timeout_seconds: u64,
    /// Timeout of the HEAD preflight check in seconds
    pub preflight_timeout_seconds: u64,
    /// Whether to verify TLS certificates
    pub verify_ssl: bool,
    /// User agent string for requests
    pub user_agent: String,
}

/// Configuration for logging behavior
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            preflight_timeout_seconds: 5,
            verify_ssl: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl FetchConfig {
    /// Fetch options for a request without caller overrides.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            headers: None,
            timeout: Duration::from_secs(self.timeout_seconds),
            verify_ssl: self.verify_ssl,
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_secs(self.preflight_timeout_seconds)
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn load_from_yaml(file_path: &str) -> GatewayResult<Self> {
        let config_content = std::fs::read_to_string(file_path)
            .map_err(|e| ConfigurationError::FileNotFound(format!("{}: {}", file_path, e)))?;
        let config: GatewayConfig = serde_yaml::from_str(&config_content)?;
        Ok(config)
    }

    /// Load configuration with fallback to default if the file is missing or invalid
    pub fn load_or_default(file_path: &str) -> Self {
        match Self::load_from_yaml(file_path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", file_path);
                config
            }
            Err(e) => {
                log::warn!(
                    "Failed to load configuration from {}: {}. Using default configuration.",
                    file_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml(&self, file_path: &str) -> GatewayResult<()> {
        let yaml_content = serde_yaml::to_string(self)?;

        if let Some(parent) = PathBuf::from(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(file_path, yaml_content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.fetch.timeout_seconds == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "Fetch timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.fetch.preflight_timeout_seconds == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "Preflight timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.fetch.user_agent.trim().is_empty() {
            return Err(ConfigurationError::ValidationFailed(
                "User agent cannot be empty".to_string(),
            ));
        }

        for (tag, kind) in &self.converter.tag_aliases {
            if let NodeKind::Heading(level) = kind {
                if !(1..=6).contains(level) {
                    return Err(ConfigurationError::ValidationFailed(format!(
                        "Tag alias '{}' has heading level {}, expected 1 to 6",
                        tag, level
                    )));
                }
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigurationError::InvalidLogLevel(format!(
                "'{}'. Must be one of: {:?}",
                self.logging.level, VALID_LOG_LEVELS
            )));
        }

        Ok(())
    }

    /// Initialize logging based on configuration; `RUST_LOG` still applies on top.
    pub fn init_logging(&self) {
        use log::LevelFilter;

        let log_level = match self.logging.level.as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        };

        let _ = env_logger::Builder::new()
            .filter_level(log_level)
            .parse_default_env()
            .try_init();
    }
}
