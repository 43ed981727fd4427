//! Stored-procedure tools for querygate.
//!
//! A tool is a whitelisted stored procedure the agent may call instead of
//! writing free-form SQL. This crate owns:
//!
//! - the [`ToolCatalog`] of a context: validated tool and parameter metadata
//! - [`ParamTransformType`]: normalizations applied to raw argument values
//! - the [`ToolParameterResolver`]: turns a partial argument map into either
//!   a ready-to-run call or the clarification questions to ask the user
//!
//! The resolver is stateless. Callers persist the values they already know
//! and replay them on the next turn.

pub mod catalog;
pub mod resolver;
pub mod transform;

pub use catalog::{StoredProcedureTool, ToolCatalog, ToolParameter};
pub use resolver::{
    Clarification, ClarificationQuestion, Rejection, Resolution, ResolutionState, ResolvedArg,
    ResolvedCall, ResolverOptions, ToolParameterResolver, DEFAULT_FALLBACK_QUESTION,
};
pub use transform::ParamTransformType;

/// Errors raised while building a tool catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid tool '{tool}': {reason}")]
    InvalidTool { tool: String, reason: String },

    #[error("duplicate tool name '{0}'")]
    DuplicateTool(String),

    #[error("duplicate parameter '{parameter}' in tool '{tool}'")]
    DuplicateParameter { tool: String, parameter: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
