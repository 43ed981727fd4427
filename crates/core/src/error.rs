//! Failure taxonomy for query validation and tool parameter resolution.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Every variant carries the offending identifier so callers can log it and
//! decide whether to ask the LLM for a corrected query.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// --- Query validation ---

/// A hard, non-recoverable reason to deny a structured query.
///
/// Never auto-corrected: the only silent repair the guard performs is LIMIT
/// clamping, which is not a violation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyViolation {
    #[error("table '{table}' is not allowed for SELECT")]
    TableNotAllowed { table: String },

    #[error("column '{column}' of table '{table}' is forbidden")]
    ColumnForbidden { table: String, column: String },

    #[error("{join_type} JOIN is not allowed")]
    JoinNotAllowed { join_type: String },

    #[error("aggregation function {function} is not allowed")]
    AggregationNotAllowed { function: String },

    #[error("{clause} clause is not allowed")]
    ClauseNotAllowed { clause: Clause },

    #[error("forbidden keyword '{keyword}' in WHERE clause")]
    ForbiddenKeyword { keyword: String },

    #[error("invalid LIMIT '{raw}': must be a non-negative integer")]
    InvalidLimit { raw: String },
}

impl PolicyViolation {
    /// The stable kind of this violation, for audit records and metrics labels.
    pub fn kind(&self) -> ViolationKind {
        match self {
            Self::TableNotAllowed { .. } => ViolationKind::TableNotAllowed,
            Self::ColumnForbidden { .. } => ViolationKind::ColumnForbidden,
            Self::JoinNotAllowed { .. } => ViolationKind::JoinNotAllowed,
            Self::AggregationNotAllowed { .. } => ViolationKind::AggregationNotAllowed,
            Self::ClauseNotAllowed { .. } => ViolationKind::ClauseNotAllowed,
            Self::ForbiddenKeyword { .. } => ViolationKind::ForbiddenKeyword,
            Self::InvalidLimit { .. } => ViolationKind::InvalidLimit,
        }
    }
}

/// Payload-free discriminant of [`PolicyViolation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TableNotAllowed,
    ColumnForbidden,
    JoinNotAllowed,
    AggregationNotAllowed,
    ClauseNotAllowed,
    ForbiddenKeyword,
    InvalidLimit,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableNotAllowed => "table_not_allowed",
            Self::ColumnForbidden => "column_forbidden",
            Self::JoinNotAllowed => "join_not_allowed",
            Self::AggregationNotAllowed => "aggregation_not_allowed",
            Self::ClauseNotAllowed => "clause_not_allowed",
            Self::ForbiddenKeyword => "forbidden_keyword",
            Self::InvalidLimit => "invalid_limit",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional SELECT clauses gated by a policy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    GroupBy,
    OrderBy,
    Where,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Clause::GroupBy => "GROUP BY",
            Clause::OrderBy => "ORDER BY",
            Clause::Where => "WHERE",
        })
    }
}

// --- Tool parameter resolution ---

/// Why a tool parameter could not be resolved.
///
/// `MissingRequired` is recoverable through a clarification round-trip;
/// the other variants reject the whole invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterError {
    #[error("missing required parameter '{parameter}'")]
    MissingRequired { parameter: String },

    #[error("transformation {transformation} failed on parameter '{parameter}': {reason}")]
    TransformFailed {
        parameter: String,
        transformation: String,
        reason: String,
    },

    #[error("unknown parameter '{parameter}'")]
    UnknownParameter { parameter: String },
}

impl ParameterError {
    /// Whether the clarification workflow can recover from this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingRequired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_displays_offending_identifier() {
        let err = PolicyViolation::ColumnForbidden {
            table: "public.ventas".into(),
            column: "salario".into(),
        };
        assert!(err.to_string().contains("salario"));
        assert!(err.to_string().contains("public.ventas"));
        assert_eq!(err.kind(), ViolationKind::ColumnForbidden);
    }

    #[test]
    fn clause_violation_uses_sql_spelling() {
        let err = PolicyViolation::ClauseNotAllowed {
            clause: Clause::GroupBy,
        };
        assert_eq!(err.to_string(), "GROUP BY clause is not allowed");
    }

    #[test]
    fn violation_serializes_with_kind_tag() {
        let err = PolicyViolation::InvalidLimit { raw: "-5".into() };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "invalid_limit");
        assert_eq!(json["raw"], "-5");
        assert_eq!(err.kind().to_string(), "invalid_limit");
    }

    #[test]
    fn only_missing_required_is_recoverable() {
        assert!(
            ParameterError::MissingRequired {
                parameter: "p_dni".into()
            }
            .is_recoverable()
        );
        assert!(
            !ParameterError::UnknownParameter {
                parameter: "p_x".into()
            }
            .is_recoverable()
        );
    }
}
