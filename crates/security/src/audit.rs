//! Audit logging: structured records of policy decisions.
//!
//! Entries live in a bounded in-memory buffer. When it is full the oldest
//! tenth is dropped before the new entry is pushed.

use chrono::{DateTime, Utc};
use querygate_core::ViolationKind;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Capacity used by [`AuditLogger::new`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    /// Knowledge context the decision was made in
    pub context: String,
    /// Table or tool the decision is about
    pub target: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Types of auditable policy decisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A structured query passed every check
    QueryAllowed { effective_limit: u32 },
    /// A structured query was denied
    QueryDenied { kind: ViolationKind },
    /// A tool call resolved to a ready procedure call
    ToolResolved,
    /// Required tool parameters are missing
    ClarificationRequested { parameters: Vec<String> },
    /// A tool call was rejected
    ToolRejected,
    /// Context documents were (re)loaded
    ContextReloaded { contexts: usize },
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Pending,
    Denied,
}

/// Trait for audit log sinks (where events are written).
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// In-memory audit logger with optional forwarding sinks.
pub struct AuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
    max_entries: usize,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("max_entries", &self.max_entries)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a new audit logger with no sinks.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a logger keeping at most `max_entries` entries (minimum 1).
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_entries: max_entries.max(1),
            sinks: Vec::new(),
        }
    }

    /// Add a sink that receives every future entry.
    pub fn with_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Record an audit event.
    pub fn log(
        &self,
        event: AuditEvent,
        context: &str,
        target: &str,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
            context: context.into(),
            target: target.into(),
            outcome,
            details,
        };

        {
            let mut entries = self.lock();
            if entries.len() >= self.max_entries {
                let excess = (self.max_entries / 10).max(1);
                entries.drain(..excess);
            }
            entries.push(entry.clone());
        }

        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    /// Get all recorded entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().clone()
    }

    /// Get entries with the given outcome.
    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    /// Get entries recorded for one context.
    pub fn entries_for_context(&self, context: &str) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| e.context == context)
            .cloned()
            .collect()
    }

    /// Clear all stored entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Count of stored entries.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // A panicking sink must not disable auditing.
    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A tracing-based audit sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            id = %entry.id,
            event = ?entry.event,
            context = %entry.context,
            target = %entry.target,
            outcome = ?entry.outcome,
            details = ?entry.details,
            "AUDIT"
        );
    }
}
