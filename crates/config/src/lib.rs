//! Configuration loading and validation for querygate.
//!
//! Loads configuration from `~/.querygate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`AppConfig::contexts_dir`].
pub const ENV_CONTEXTS_DIR: &str = "QUERYGATE_CONTEXTS_DIR";

/// Environment variable overriding [`LogConfig::json`].
pub const ENV_LOG_JSON: &str = "QUERYGATE_LOG_JSON";

/// The root configuration structure.
///
/// Maps directly to `~/.querygate/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding one `<name>.json` document per knowledge context
    #[serde(default = "default_contexts_dir")]
    pub contexts_dir: PathBuf,

    /// Tool parameter resolution
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Audit trail of policy decisions
    #[serde(default)]
    pub audit: AuditConfig,

    /// Log output
    #[serde(default)]
    pub log: LogConfig,
}

fn default_contexts_dir() -> PathBuf {
    AppConfig::config_dir().join("contexts")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Asked when a required parameter has no clarification question.
    /// `{parameter}` is replaced with the parameter name.
    #[serde(default = "default_fallback_question")]
    pub fallback_question: String,
}

fn default_fallback_question() -> String {
    "Please provide a value for '{parameter}'.".into()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fallback_question: default_fallback_question(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entries kept in memory before the oldest are dropped
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_true() -> bool {
    true
}
fn default_max_entries() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    ///
    /// Environment variables take precedence over the file:
    /// - `QUERYGATE_CONTEXTS_DIR`
    /// - `QUERYGATE_LOG_JSON` (`1`/`true`/`yes` or `0`/`false`/`no`)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_CONTEXTS_DIR).filter(|d| !d.trim().is_empty()) {
            self.contexts_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_LOG_JSON) {
            self.log.json = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "{ENV_LOG_JSON} must be a boolean, got '{raw}'"
                    )));
                }
            };
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".querygate")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contexts_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "contexts_dir cannot be empty".into(),
            ));
        }

        if self.resolver.fallback_question.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "resolver.fallback_question cannot be empty".into(),
            ));
        }

        if self.audit.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "audit.max_entries must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            contexts_dir: default_contexts_dir(),
            resolver: ResolverConfig::default(),
            audit: AuditConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
