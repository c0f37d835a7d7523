//! File-based configuration for ramped runs.
//!
//! Sources, highest priority first:
//! 1. Command-line flags
//! 2. `CANNON_*` environment variables (declared on the CLI)
//! 3. TOML configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::auth::DEFAULT_TOKEN_COMMAND;
use crate::generator::DEFAULT_GENERATOR;
use crate::payload::{RequestType, DEFAULT_CREDENTIAL_NAME};

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CannonConfig {
    /// Concurrency sweep parameters
    #[serde(default)]
    pub ramp: RampSettings,

    /// Target service and request kind
    #[serde(default)]
    pub target: TargetSettings,

    /// Credential supply
    #[serde(default)]
    pub auth: AuthSettings,

    /// Report persistence
    #[serde(default)]
    pub output: OutputSettings,

    /// External load generator
    #[serde(default)]
    pub generator: GeneratorSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampSettings {
    /// Requests per concurrency step (default: 10000)
    #[serde(default = "default_num_requests")]
    pub num_requests: u32,

    /// First concurrency level (default: 1)
    #[serde(default = "default_min_concurrent")]
    pub min_concurrent: u32,

    /// Last concurrency level, inclusive (default: 50)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,

    /// Concurrency increment (default: 1)
    #[serde(default = "default_step")]
    pub step: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Base URL of the credential API (default: "https://localhost:8844")
    #[serde(default = "default_url")]
    pub url: String,

    /// Request kind: set, get, or interpolate (default: get)
    #[serde(default)]
    pub request_type: RequestType,

    /// Credential the requests operate on
    #[serde(default = "default_credential_name")]
    pub credential_name: String,
}

/// How requests authenticate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// mTLS client certificate and key
    #[default]
    X509,
    /// Bearer token from an external command
    Token,
    /// Unauthenticated
    None,
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x509" => Ok(Self::X509),
            "token" => Ok(Self::Token),
            "none" => Ok(Self::None),
            _ => Err(format!(
                "invalid auth mode '{s}'. Use 'x509', 'token', or 'none'."
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub mode: AuthMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509_cert: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509_key: Option<PathBuf>,

    /// Command printing a bearer token (default: "credhub --token")
    #[serde(default = "default_token_command")]
    pub token_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Write the report at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory for timestamped report files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Fixed report path; overrides `dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Load generator executable (default: "hey")
    #[serde(default = "default_program")]
    pub program: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty (default: "pretty")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_num_requests() -> u32 {
    10_000
}

fn default_min_concurrent() -> u32 {
    1
}

fn default_max_concurrent() -> u32 {
    50
}

fn default_step() -> u32 {
    1
}

fn default_url() -> String {
    "https://localhost:8844".to_string()
}

fn default_credential_name() -> String {
    DEFAULT_CREDENTIAL_NAME.to_string()
}

fn default_token_command() -> String {
    DEFAULT_TOKEN_COMMAND.to_string()
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/var/vcap/sys/log/credhub_cannon")
}

fn default_program() -> PathBuf {
    PathBuf::from(DEFAULT_GENERATOR)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for RampSettings {
    fn default() -> Self {
        Self {
            num_requests: default_num_requests(),
            min_concurrent: default_min_concurrent(),
            max_concurrent: default_max_concurrent(),
            step: default_step(),
        }
    }
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            request_type: RequestType::default(),
            credential_name: default_credential_name(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            x509_cert: None,
            x509_key: None,
            token_command: default_token_command(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_output_dir(),
            path: None,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CannonConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file doesn't exist or has invalid TOML syntax.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::TomlError { path, source: e })
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate settings that are not covered by ramp validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be one of: {}",
                valid_formats.join(", ")
            )));
        }

        if self.target.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "target.url cannot be empty".to_string(),
            ));
        }

        if self.generator.program.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "generator.program cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file
    #[error("Failed to read config file {path:?}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("Failed to parse TOML in {path:?}: {source}")]
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
