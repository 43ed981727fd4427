//! `querygate context`: inspect knowledge contexts.

use super::{CmdResult, load_engine};
use querygate_context::{ContextError, ContextMode, KnowledgeContext};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

pub async fn list(config: Option<&Path>) -> CmdResult<ExitCode> {
    let engine = load_engine(config)?;
    let registry = engine.registry();

    if registry.is_empty() {
        println!("No contexts found.");
        if let Some(dir) = registry.dir() {
            println!("Add <name>.json documents to {}", dir.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("📚 Contexts ({}):", registry.len());
    for name in registry.list() {
        let Some(ctx) = registry.get(&name) else {
            continue;
        };
        println!("  {}", summary_line(&ctx));
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn show(config: Option<&Path>, name: &str) -> CmdResult<ExitCode> {
    let ctx = find(config, name)?;
    println!("{}", serde_json::to_string_pretty(ctx.as_ref())?);
    Ok(ExitCode::SUCCESS)
}

pub async fn prompt(config: Option<&Path>, name: &str) -> CmdResult<ExitCode> {
    let ctx = find(config, name)?;
    println!("{}", ctx.prompt());
    Ok(ExitCode::SUCCESS)
}

fn find(config: Option<&Path>, name: &str) -> CmdResult<Arc<KnowledgeContext>> {
    let engine = load_engine(config)?;
    let ctx = engine
        .registry()
        .get(name)
        .ok_or_else(|| ContextError::UnknownContext(name.to_string()))?;
    Ok(ctx)
}

fn summary_line(ctx: &KnowledgeContext) -> String {
    let mode = match ctx.mode {
        ContextMode::DatabaseQuery => "database_query",
        ContextMode::Documents => "documents",
    };
    let tables = ctx
        .select_policy()
        .map(|p| p.allowed_tables_for_select().len())
        .unwrap_or(0);
    format!(
        "{:<24} {:<15} tables: {:<3} tools: {}",
        ctx.name,
        mode,
        tables,
        ctx.tools.len()
    )
}
