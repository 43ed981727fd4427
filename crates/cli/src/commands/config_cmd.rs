//! `querygate config`: configuration management commands.

use super::{CmdResult, config_file, load_config};
use std::path::Path;
use std::process::ExitCode;

pub async fn validate(path: Option<&Path>) -> CmdResult<ExitCode> {
    println!("🔍 Validating configuration...");

    match load_config(path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.contexts_dir.is_dir() {
                warnings.push(format!(
                    "contexts_dir {} does not exist",
                    config.contexts_dir.display()
                ));
            }
            if !config.resolver.fallback_question.contains("{parameter}") {
                warnings.push(
                    "resolver.fallback_question has no {parameter} placeholder".to_string(),
                );
            }
            if !config.audit.enabled {
                warnings.push("Audit log is disabled".to_string());
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Contexts:  {}", config.contexts_dir.display());
            println!(
                "   Audit:     {} (max {} entries)",
                if config.audit.enabled { "enabled" } else { "disabled" },
                config.audit.max_entries
            );
            println!(
                "   Log:       {}{}",
                config.log.level,
                if config.log.json { " (json)" } else { "" }
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            Err(e.into())
        }
    }
}

pub async fn show(path: Option<&Path>) -> CmdResult<ExitCode> {
    let config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}

pub async fn path(path: Option<&Path>) -> CmdResult<ExitCode> {
    println!("{}", config_file(path).display());
    Ok(ExitCode::SUCCESS)
}
