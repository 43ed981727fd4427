//! `querygate doctor`: diagnose configuration and context documents.

use super::{CmdResult, config_file, load_config};
use querygate_context::{ContextMode, ContextRegistry};
use std::path::Path;
use std::process::ExitCode;

pub async fn run(path: Option<&Path>) -> CmdResult<ExitCode> {
    println!("🩺 querygate doctor");
    println!("===================\n");

    let mut issues = 0;

    let config_path = config_file(path);
    if !config_path.exists() {
        println!("  ⚠️  No config file at {}, using defaults", config_path.display());
    }

    let config = match load_config(path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    if !config.contexts_dir.is_dir() {
        println!(
            "  ❌ Contexts directory {} does not exist",
            config.contexts_dir.display()
        );
        return Ok(ExitCode::FAILURE);
    }
    println!("  ✅ Contexts directory {}", config.contexts_dir.display());

    let registry = match ContextRegistry::load_dir(&config.contexts_dir) {
        Ok(registry) => registry,
        Err(e) => {
            println!("  ❌ {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    if registry.is_empty() {
        println!("  ⚠️  No context documents found");
        issues += 1;
    }

    for name in registry.list() {
        let Some(ctx) = registry.get(&name) else {
            continue;
        };
        let mut notes = Vec::new();
        if ctx
            .select_policy()
            .is_some_and(|p| p.allowed_tables_for_select().is_empty())
        {
            notes.push("SELECT policy allows no tables");
        }
        if ctx.mode == ContextMode::Documents && ctx.sql_select_policy.is_some() {
            notes.push("sql_select_policy is ignored in documents mode");
        }

        if notes.is_empty() {
            println!("  ✅ {name}: {} tool(s)", ctx.tools.len());
        } else {
            issues += notes.len();
            for note in notes {
                println!("  ⚠️  {name}: {note}");
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(ExitCode::SUCCESS)
}
