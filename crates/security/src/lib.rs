//! Security module for querygate: the audit trail of policy decisions.
//!
//! Every denied query, rejected tool call and clarification round is
//! recorded as an [`AuditEntry`] and forwarded to the configured sinks.

pub mod audit;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
