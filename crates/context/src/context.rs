//! The knowledge context document.

use crate::{ContextError, Result};
use querygate_policy::SqlSelectPolicy;
use querygate_tools::{StoredProcedureTool, ToolCatalog};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// What a context answers questions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Text-to-SQL against a production database.
    DatabaseQuery,
    /// Retrieval over ingested documents. No SQL is generated.
    Documents,
}

/// A named knowledge domain.
///
/// ```json
/// {
///   "name": "academico",
///   "description": "Grades and enrolment",
///   "mode": "database_query",
///   "sql_select_policy": { "allowed_tables_for_select": ["public.alumnos"] },
///   "tools": [ { "tool_name": "fn_get_grades", "procedure_name": "academic.fn_get_grades" } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeContext {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub mode: ContextMode,

    #[serde(default)]
    pub sql_select_policy: Option<SqlSelectPolicy>,

    #[serde(default)]
    pub tools: ToolCatalog,
}

impl KnowledgeContext {
    pub fn database(name: impl Into<String>, policy: SqlSelectPolicy) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            mode: ContextMode::DatabaseQuery,
            sql_select_policy: Some(policy),
            tools: ToolCatalog::new(),
        }
    }

    pub fn documents(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            mode: ContextMode::Documents,
            sql_select_policy: None,
            tools: ToolCatalog::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a tool to this context's catalog.
    pub fn register_tool(&mut self, tool: StoredProcedureTool) -> Result<()> {
        self.tools.register(tool)?;
        Ok(())
    }

    /// Parse and validate a context document.
    pub fn from_json(json: &str) -> Result<Self> {
        let context: Self = serde_json::from_str(json)?;
        context.check().map_err(|reason| ContextError::InvalidDocument {
            path: format!("<{}>", context.name).into(),
            reason,
        })?;
        Ok(context)
    }

    /// Load `path`. The document's `name` must equal the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |reason: String| ContextError::InvalidDocument {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|source| ContextError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let context: Self = serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        context.check().map_err(invalid)?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem != context.name {
            return Err(invalid(format!(
                "context name '{}' does not match file name '{stem}'",
                context.name
            )));
        }
        Ok(context)
    }

    /// The policy queries are validated against, if this context runs SQL.
    pub fn select_policy(&self) -> Option<&SqlSelectPolicy> {
        match self.mode {
            ContextMode::DatabaseQuery => self.sql_select_policy.as_ref(),
            ContextMode::Documents => None,
        }
    }

    /// Agent-facing prompt: description, SQL policy and tools.
    pub fn prompt(&self) -> String {
        let mut sections = Vec::new();
        if !self.description.is_empty() {
            sections.push(format!("Context: {}\n{}", self.name, self.description));
        } else {
            sections.push(format!("Context: {}", self.name));
        }
        if let Some(policy) = self.select_policy() {
            sections.push(policy.prompt_section());
        }
        let tools = self.tools.generate_prompt(None);
        if !tools.is_empty() {
            sections.push(tools);
        }
        sections.join("\n\n")
    }

    fn check(&self) -> std::result::Result<(), String> {
        if !is_context_name(&self.name) {
            return Err(format!(
                "context name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.name
            ));
        }
        match (self.mode, &self.sql_select_policy) {
            (ContextMode::DatabaseQuery, None) => {
                return Err("database_query contexts require a sql_select_policy".into());
            }
            (ContextMode::Documents, Some(_)) => {
                warn!(context = %self.name, "sql_select_policy ignored in documents mode");
            }
            _ => {}
        }
        Ok(())
    }
}

fn is_context_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
