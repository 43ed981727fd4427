//! `querygate resolve`: resolve the parameters of a tool call.

use super::{CmdResult, load_engine};
use querygate_core::ToolInvocationRequest;
use querygate_tools::Resolution;
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;

pub async fn run(
    config: Option<&Path>,
    context: &str,
    tool: &str,
    args: &str,
) -> CmdResult<ExitCode> {
    let engine = load_engine(config)?;
    let request = parse_request(tool, args)?;

    let resolution = engine.resolve_tool(context, &request)?;
    println!("{}", serde_json::to_string_pretty(&resolution)?);

    Ok(match resolution {
        Resolution::Rejected(_) => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    })
}

fn parse_request(tool: &str, args: &str) -> CmdResult<ToolInvocationRequest> {
    let value: Value = serde_json::from_str(args).map_err(|e| format!("Invalid --args JSON: {e}"))?;
    let Value::Object(arguments) = value else {
        return Err("--args must be a JSON object".into());
    };
    let mut request = ToolInvocationRequest::new(tool);
    request.merge(arguments);
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_argument_object() {
        let request = parse_request("fn_get_grades", r#"{"p_dni": "12-34"}"#).unwrap();
        assert_eq!(request.tool_name, "fn_get_grades");
        assert_eq!(request.arguments["p_dni"], "12-34");
    }

    #[test]
    fn rejects_non_object_args() {
        assert!(parse_request("t", "[1, 2]").is_err());
        assert!(parse_request("t", "not json").is_err());
    }
}
