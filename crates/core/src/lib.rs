//! # querygate Core
//!
//! Domain types and error definitions shared by every querygate crate.
//! This crate has **no engine logic**. It defines the vocabulary that the
//! policy guard, the tool resolver and the context engine speak:
//!
//! - [`StructuredQueryRequest`]: the already-parsed SELECT an agent wants to run
//! - [`ToolInvocationRequest`]: a tool name plus a partial argument map
//! - [`PolicyViolation`] / [`ParameterError`]: the closed failure taxonomy
//!
//! Identifiers (tables, columns, keywords) are compared ASCII
//! case-insensitively everywhere; [`ident`] holds the shared helpers.

pub mod error;
pub mod ident;
pub mod query;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Clause, ParameterError, PolicyViolation, ViolationKind};
pub use query::{
    Aggregation, ColumnRef, JoinClause, OrderBy, RequestedLimit, StructuredQueryRequest,
    WhereClause,
};
pub use tool::ToolInvocationRequest;
