//! Subcommand implementations.

pub mod check;
pub mod config_cmd;
pub mod context;
pub mod doctor;
pub mod resolve;

use querygate_config::{AppConfig, ConfigError};
use querygate_context::ContextEngine;
use std::path::Path;
use tokio::io::AsyncReadExt;

pub type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load the config from `path`, or from the default location.
///
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }
        None => AppConfig::load(),
    }
}

pub fn config_file(path: Option<&Path>) -> std::path::PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path)
}

/// Load the config and every context it points at.
pub fn load_engine(path: Option<&Path>) -> CmdResult<ContextEngine> {
    let config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    let engine = ContextEngine::from_config(&config)
        .map_err(|e| format!("Failed to load contexts: {e}"))?;
    Ok(engine)
}

/// Read a file, or stdin when `source` is `-`.
pub async fn read_input(source: &str) -> CmdResult<String> {
    if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        Ok(buf)
    } else {
        let content = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| format!("Failed to read {source}: {e}"))?;
        Ok(content)
    }
}
