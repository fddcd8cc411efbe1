//! Configuration module for GCS Uploadr
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.
//!
//! # Example
//!
//! ```yaml
//! storage:
//!   project_id: "${GCP_PROJECT_ID}"
//!   bucket_id: "user-uploads"
//!   directory_prefix: "attachments"
//!   credentials_file: "/etc/gcs-uploadr/service-account.json"
//! upload:
//!   allowed_extensions: [".png", ".jpeg", ".pdf", ".doc", ".mp3"]
//! logging:
//!   level: "info"
//!   json: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Default Cloud Storage endpoint
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Extensions accepted when no allow-list is configured
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".png", ".jpeg", ".pdf", ".doc", ".mp3"];

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "storage.{} is required",
            field
        )));
    }
    Ok(())
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadPolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        self.upload.validate()?;

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level '{}': must be one of trace, debug, info, warn, error",
                    other
                )))
            }
        }

        Ok(())
    }
}

/// Cloud Storage backend configuration
///
/// Read once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub project_id: String,
    pub bucket_id: String,
    /// Directory every object name is placed under
    pub directory_prefix: String,
    /// Path to the service account key file
    pub credentials_file: PathBuf,
    /// Overrides the public endpoint (emulators, tests)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require("project_id", &self.project_id)?;
        require("bucket_id", &self.bucket_id)?;
        require("directory_prefix", &self.directory_prefix)?;
        require(
            "credentials_file",
            &self.credentials_file.to_string_lossy(),
        )?;

        if let Some(ref endpoint) = self.endpoint {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(
                    "Invalid storage endpoint: must start with http:// or https://".into(),
                ));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "storage.timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Endpoint the client talks to
    pub fn endpoint(&self) -> &str {
        resolve_endpoint(self.endpoint.as_deref())
    }
}

/// Resolve an optional endpoint override, without a trailing slash
pub fn resolve_endpoint(endpoint: Option<&str>) -> &str {
    endpoint.unwrap_or(DEFAULT_ENDPOINT).trim_end_matches('/')
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Upload policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicyConfig {
    /// Case-sensitive file name suffixes, checked in order
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Where payloads are staged before upload. Default: system temp dir
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for UploadPolicyConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            temp_dir: None,
        }
    }
}

impl UploadPolicyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one allowed extension must be configured".into(),
            ));
        }

        for ext in &self.allowed_extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid extension '{}': must be '.' followed by at least one character",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Directory used for temporary upload artifacts
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_log_json(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    true
}
