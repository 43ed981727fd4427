//! Tool catalog: typed stored-procedure metadata and prompt generation.
//!
//! Owns tool *metadata*, never connections: execution happens in the layer
//! that receives a [`crate::ResolvedCall`].

use crate::CatalogError;
use crate::transform::ParamTransformType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Parameter definition
// =============================================================================

/// One argument of a stored procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Argument name as the procedure expects it (e.g. `p_dni`).
    pub name: String,

    #[serde(default)]
    pub description_for_llm: String,

    #[serde(default)]
    pub is_required: bool,

    /// Asked back to the end user when this parameter is required and
    /// missing. Empty means "use the generic fallback".
    #[serde(default)]
    pub clarification_question: String,

    /// Applied in order to a supplied value.
    #[serde(default)]
    pub transformations: Vec<ParamTransformType>,
}

impl ToolParameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description_for_llm: String::new(),
            is_required: true,
            clarification_question: String::new(),
            transformations: Vec::new(),
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            is_required: false,
            ..Self::required(name)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description_for_llm = description.into();
        self
    }

    pub fn ask(mut self, question: impl Into<String>) -> Self {
        self.clarification_question = question.into();
        self
    }

    pub fn transform(mut self, transformation: ParamTransformType) -> Self {
        self.transformations.push(transformation);
        self
    }
}

// =============================================================================
// Tool definition
// =============================================================================

/// A whitelisted stored procedure exposed to the agent under `tool_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProcedureTool {
    /// Agent-facing identifier, unique within a context.
    pub tool_name: String,

    /// The real procedure/function to invoke. Never shown to the agent.
    pub procedure_name: String,

    #[serde(default)]
    pub description_for_llm: String,

    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl StoredProcedureTool {
    pub fn new(tool_name: impl Into<String>, procedure_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            procedure_name: procedure_name.into(),
            description_for_llm: String::new(),
            parameters: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description_for_llm = description.into();
        self
    }

    pub fn param(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check names and identifiers.
    ///
    /// `procedure_name` and parameter names end up in an executable call,
    /// so they are restricted to `[A-Za-z0-9_.]`.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidTool {
            tool: if self.tool_name.is_empty() {
                "(empty)".into()
            } else {
                self.tool_name.clone()
            },
            reason,
        };

        if self.tool_name.trim().is_empty() {
            return Err(invalid("tool name cannot be empty".into()));
        }
        if !is_sql_identifier(&self.procedure_name) {
            return Err(invalid(format!(
                "procedure name '{}' is not a valid identifier",
                self.procedure_name
            )));
        }

        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if !is_sql_identifier(&parameter.name) || parameter.name.contains('.') {
                return Err(invalid(format!(
                    "parameter name '{}' is not a valid identifier",
                    parameter.name
                )));
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(CatalogError::DuplicateParameter {
                    tool: self.tool_name.clone(),
                    parameter: parameter.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Generate a prompt line for this tool.
    ///
    /// Format: `- tool_name(required, optional?): description`, followed by
    /// one indented line per described parameter.
    pub fn to_prompt_line(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let optional = if p.is_required { "" } else { "?" };
                format!("{}{}", p.name, optional)
            })
            .collect();

        let mut line = format!(
            "- {}({}): {}",
            self.tool_name,
            params.join(", "),
            self.description_for_llm
        );
        for p in self.parameters.iter().filter(|p| !p.description_for_llm.is_empty()) {
            line.push_str(&format!("\n    {}: {}", p.name, p.description_for_llm));
        }
        line
    }
}

fn is_sql_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('.')
        && !s.ends_with('.')
        && !s.contains("..")
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

// =============================================================================
// Tool catalog
// =============================================================================

/// The validated tools of one context, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StoredProcedureTool>", into = "Vec<StoredProcedureTool>")]
pub struct ToolCatalog {
    tools: Vec<StoredProcedureTool>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, validating every tool.
    pub fn from_tools<I>(tools: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = StoredProcedureTool>,
    {
        let mut catalog = Self::new();
        for tool in tools {
            catalog.register(tool)?;
        }
        Ok(catalog)
    }

    /// Parse a JSON array of tools.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let tools: Vec<StoredProcedureTool> = serde_json::from_str(json)?;
        Self::from_tools(tools)
    }

    /// Register a tool. Tool names must be unique.
    pub fn register(&mut self, tool: StoredProcedureTool) -> Result<(), CatalogError> {
        tool.validate()?;
        if self.index.contains_key(&tool.tool_name) {
            return Err(CatalogError::DuplicateTool(tool.tool_name));
        }
        self.index.insert(tool.tool_name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by its agent-facing name.
    pub fn get(&self, tool_name: &str) -> Option<&StoredProcedureTool> {
        self.index.get(tool_name).map(|&i| &self.tools[i])
    }

    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.index.contains_key(tool_name)
    }

    /// Tool names in configured order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.tool_name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredProcedureTool> {
        self.tools.iter()
    }

    /// Generate formatted prompt section for LLM consumption.
    ///
    /// If `allowed_tools` is Some, only include those tools.
    pub fn generate_prompt(&self, allowed_tools: Option<&[String]>) -> String {
        let entries: Vec<&StoredProcedureTool> = match allowed_tools {
            Some(allowed) => allowed.iter().filter_map(|name| self.get(name)).collect(),
            None => self.tools.iter().collect(),
        };

        if entries.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(entries.len() + 1);
        lines.push("Available tools:".to_string());
        for entry in entries {
            lines.push(entry.to_prompt_line());
        }
        lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl TryFrom<Vec<StoredProcedureTool>> for ToolCatalog {
    type Error = CatalogError;

    fn try_from(tools: Vec<StoredProcedureTool>) -> Result<Self, CatalogError> {
        Self::from_tools(tools)
    }
}

impl From<ToolCatalog> for Vec<StoredProcedureTool> {
    fn from(catalog: ToolCatalog) -> Self {
        catalog.tools
    }
}

// =============================================================================
// Tests
// =============================================================================
