//! SQL query generation safety policies.
//!
//! A [`SqlSelectPolicy`] declares, per knowledge context, what an automated
//! text-to-SQL agent may run against a production database. The
//! [`SqlGuard`] evaluates an already-parsed SELECT against it and returns a
//! [`Verdict`] the execution layer must obey.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────────────────────┐    ┌──────────────┐
//! │  text-to-SQL │───▶│  SqlGuard                    │───▶│  execution   │
//! │  (request)   │    │  1. table allow-list         │    │  layer       │
//! └─────────────┘    │  2. column access rules      │    └──────────────┘
//!                    │  3. joins  4. aggregations   │
//!                    │  5. GROUP/ORDER/WHERE flags  │
//!                    │  6. forbidden WHERE keywords │
//!                    │  7. LIMIT resolution         │
//!                    └──────────────┬───────────────┘
//!                             ┌─────┴─────┐
//!                             │  Verdict  │
//!                             │ Allow(n)  │
//!                             │ Deny(why) │
//!                             └───────────┘
//! ```
//!
//! # Example policy document
//!
//! ```json
//! {
//!   "default_select_limit": 10,
//!   "max_select_limit": 50,
//!   "allowed_tables_for_select": ["public.ventas"],
//!   "column_access_rules": [
//!     { "table_name": "public.ventas",
//!       "column_policy": { "allowed_columns": [], "forbidden_columns": ["salario"] } }
//!   ]
//! }
//! ```

mod columns;
mod guard;
mod keywords;
mod policy;

pub use columns::{ColumnAccess, resolve_column};
pub use guard::{SqlGuard, Verdict};
pub use keywords::{find_forbidden_keyword, word_tokens};
pub use policy::{
    KEYWORD_SAFETY_FLOOR, SqlColumnAccessPolicy, SqlSelectPolicy, SqlSelectPolicyBuilder,
    SqlSelectPolicyDocument, normalize_join_type,
};

/// Re-export for convenience.
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

/// Errors raised while constructing or loading a policy.
///
/// These never come out of [`SqlGuard::validate`]: a policy that exists has
/// already passed every check below.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error(
        "invalid limits: default_select_limit ({default}) must be > 0 and <= max_select_limit ({max})"
    )]
    InvalidLimits { default: u32, max: u32 },

    #[error("duplicate column access rule for table '{0}'")]
    DuplicateColumnRule(String),

    #[error("column access rule for table '{0}', which is not in allowed_tables_for_select")]
    ColumnRuleForUnknownTable(String),

    #[error("empty identifier in {0}")]
    EmptyIdentifier(&'static str),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
