//! Knowledge contexts for querygate.
//!
//! A context binds one SQL SELECT policy and one stored-procedure catalog to
//! a name. Contexts are loaded from `<contexts_dir>/<name>.json`, shared as
//! immutable `Arc` snapshots, and replaced wholesale on reload.
//!
//! [`ContextEngine`] is the entry point the rest of a deployment calls:
//! it looks a context up, runs the guard or the resolver, and audits the
//! outcome.

pub mod context;
pub mod engine;
pub mod registry;

pub use context::{ContextMode, KnowledgeContext};
pub use engine::ContextEngine;
pub use registry::ContextRegistry;

use std::path::PathBuf;

/// Errors from the context layer.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("unknown context '{0}'")]
    UnknownContext(String),

    #[error("context '{0}' has no SQL SELECT policy")]
    NoSqlPolicy(String),

    #[error("context '{context}' has no tool named '{tool}'")]
    UnknownTool { context: String, tool: String },

    #[error("invalid context document {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog error: {0}")]
    Catalog(#[from] querygate_tools::CatalogError),
}

pub type Result<T> = std::result::Result<T, ContextError>;
