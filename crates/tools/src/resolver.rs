//! Tool parameter resolution.
//!
//! ```text
//!                      ┌──────────────────────────┐
//!   known params ─────▶│  CollectingParameters    │
//!                      └────────────┬─────────────┘
//!          ┌────────────────────────┼──────────────────────┐
//!          ▼                        ▼                      ▼
//!   AllParametersResolved   NeedsClarification         Rejected
//!   (ResolvedCall)          (questions + resolved)     (ParameterError)
//! ```
//!
//! Resolution is a pure function of the tool definition and the known
//! values. A caller that receives `NeedsClarification` asks the user, merges
//! the answers over `Clarification::resolved` and resolves again.

use crate::catalog::StoredProcedureTool;
use querygate_core::ParameterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Default question when a required parameter has none configured.
/// `{parameter}` is replaced with the parameter name.
pub const DEFAULT_FALLBACK_QUESTION: &str = "Please provide a value for '{parameter}'.";

/// States of one resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    CollectingParameters,
    AllParametersResolved,
    NeedsClarification,
    Rejected,
}

/// A parameter value after transformations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedArg {
    pub name: String,
    pub value: Value,
}

/// A fully resolved, ready-to-execute procedure call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCall {
    pub tool_name: String,
    pub procedure_name: String,
    /// In declared parameter order. Absent optional parameters are omitted.
    pub args: Vec<ResolvedArg>,
}

impl ResolvedCall {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn args_map(&self) -> Map<String, Value> {
        self.args
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationQuestion {
    pub parameter: String,
    pub question: String,
}

/// Questions for the user plus everything resolved so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clarification {
    pub tool_name: String,
    /// Already-transformed values to replay on the next turn.
    pub resolved: Map<String, Value>,
    /// One per missing required parameter, in declared order.
    pub questions: Vec<ClarificationQuestion>,
}

impl Clarification {
    pub fn missing_parameters(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.parameter.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub tool_name: String,
    pub error: ParameterError,
}

/// Terminal outcome of [`ToolParameterResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Resolution {
    AllParametersResolved(ResolvedCall),
    NeedsClarification(Clarification),
    Rejected(Rejection),
}

impl Resolution {
    pub fn state(&self) -> ResolutionState {
        match self {
            Self::AllParametersResolved(_) => ResolutionState::AllParametersResolved,
            Self::NeedsClarification(_) => ResolutionState::NeedsClarification,
            Self::Rejected(_) => ResolutionState::Rejected,
        }
    }

    pub fn call(&self) -> Option<&ResolvedCall> {
        match self {
            Self::AllParametersResolved(call) => Some(call),
            _ => None,
        }
    }

    pub fn clarification(&self) -> Option<&Clarification> {
        match self {
            Self::NeedsClarification(c) => Some(c),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&ParameterError> {
        match self {
            Self::Rejected(r) => Some(&r.error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Template used when a parameter has no clarification question.
    pub fallback_question: String,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            fallback_question: DEFAULT_FALLBACK_QUESTION.into(),
        }
    }
}

/// Resolves tool parameters. Holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct ToolParameterResolver {
    options: ResolverOptions,
}

impl ToolParameterResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `known` against the parameters declared by `tool`.
    pub fn resolve(&self, tool: &StoredProcedureTool, known: &Map<String, Value>) -> Resolution {
        let reject = |error: ParameterError| {
            warn!(tool = %tool.tool_name, error = %error, "Tool invocation rejected");
            Resolution::Rejected(Rejection {
                tool_name: tool.tool_name.clone(),
                error,
            })
        };

        if let Some(unknown) = known.keys().find(|k| tool.parameter(k).is_none()) {
            return reject(ParameterError::UnknownParameter {
                parameter: unknown.clone(),
            });
        }

        let mut args = Vec::with_capacity(tool.parameters.len());
        let mut questions = Vec::new();

        for parameter in &tool.parameters {
            let supplied = known.get(&parameter.name).filter(|v| is_present(v));

            let mut value = None;
            if let Some(raw) = supplied {
                let mut transformed = raw.clone();
                for transformation in &parameter.transformations {
                    transformed = match transformation.apply(&transformed) {
                        Ok(v) => v,
                        Err(reason) => {
                            return reject(ParameterError::TransformFailed {
                                parameter: parameter.name.clone(),
                                transformation: transformation.to_string(),
                                reason,
                            });
                        }
                    };
                }
                // "---" through REMOVE_DASHES is as absent as "".
                value = Some(transformed).filter(is_present);
            }

            match value {
                Some(value) => args.push(ResolvedArg {
                    name: parameter.name.clone(),
                    value,
                }),
                None if parameter.is_required => questions.push(ClarificationQuestion {
                    parameter: parameter.name.clone(),
                    question: self
                        .question_for(&parameter.name, &parameter.clarification_question),
                }),
                None => {}
            }
        }

        if !questions.is_empty() {
            info!(
                tool = %tool.tool_name,
                missing = questions.len(),
                "Clarification needed"
            );
            return Resolution::NeedsClarification(Clarification {
                tool_name: tool.tool_name.clone(),
                resolved: args.into_iter().map(|a| (a.name, a.value)).collect(),
                questions,
            });
        }

        debug!(tool = %tool.tool_name, args = args.len(), "All parameters resolved");
        Resolution::AllParametersResolved(ResolvedCall {
            tool_name: tool.tool_name.clone(),
            procedure_name: tool.procedure_name.clone(),
            args,
        })
    }

    fn question_for(&self, parameter: &str, configured: &str) -> String {
        if configured.trim().is_empty() {
            self.options.fallback_question.replace("{parameter}", parameter)
        } else {
            configured.to_string()
        }
    }
}

/// Null and blank strings count as not supplied.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
