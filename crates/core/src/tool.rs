//! Tool invocation requests.
//!
//! An agent that picked a stored-procedure tool sends the tool name plus
//! whatever arguments it could extract from the conversation. Callers that
//! went through a clarification round replay the previously resolved values
//! here together with the user's new answers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to resolve the parameters of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Optional call ID (matches the LLM's tool_call.id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    /// Agent-facing tool name
    pub tool_name: String,

    /// Known argument values, keyed by parameter name
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocationRequest {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            call_id: None,
            tool_name: tool_name.into(),
            arguments: Map::new(),
        }
    }

    /// Add or replace a known argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Merge newly supplied answers over previously known values.
    pub fn merge(&mut self, answers: Map<String, Value>) {
        for (name, value) in answers {
            self.arguments.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arguments_object() {
        let json = r#"{"tool_name": "fn_get_grades", "arguments": {"p_dni": "12-34"}}"#;
        let req: ToolInvocationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.tool_name, "fn_get_grades");
        assert_eq!(req.arguments["p_dni"], "12-34");
        assert!(req.call_id.is_none());
    }

    #[test]
    fn merge_overrides_known_values() {
        let mut req = ToolInvocationRequest::new("fn_get_grades")
            .with_arg("p_dni", "1234")
            .with_arg("p_year", 2023);

        let mut answers = Map::new();
        answers.insert("p_year".into(), Value::from(2024));
        req.merge(answers);

        assert_eq!(req.arguments["p_dni"], "1234");
        assert_eq!(req.arguments["p_year"], 2024);
    }
}
