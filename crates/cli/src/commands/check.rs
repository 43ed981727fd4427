//! `querygate check`: validate a structured SELECT request.

use super::{CmdResult, load_engine, read_input};
use querygate_core::StructuredQueryRequest;
use std::path::Path;
use std::process::ExitCode;

pub async fn run(config: Option<&Path>, context: &str, source: &str) -> CmdResult<ExitCode> {
    let engine = load_engine(config)?;
    let raw = read_input(source).await?;
    let request: StructuredQueryRequest =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid query request: {e}"))?;

    let verdict = engine.validate_query(context, &request)?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    Ok(if verdict.is_allowed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
