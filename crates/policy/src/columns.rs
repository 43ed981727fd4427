//! Per-table column access resolution.
//!
//! Rules, in order:
//! - a forbidden column is denied, even if it is also allow-listed
//! - with a non-empty allow-list, only listed columns are allowed
//! - otherwise every column is allowed
//! - a table without any rule allows every column
//!
//! The wildcard `*` stands for every column of the table, so it is only
//! allowed where no column could be denied.

use crate::policy::{SqlColumnAccessPolicy, SqlSelectPolicy};
use serde::{Deserialize, Serialize};

/// Outcome of resolving one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAccess {
    Allowed,
    Denied,
}

impl ColumnAccess {
    pub fn is_allowed(self) -> bool {
        self == ColumnAccess::Allowed
    }
}

impl SqlColumnAccessPolicy {
    /// Resolve a single column against this rule.
    pub fn check(&self, column: &str) -> ColumnAccess {
        if column.trim() == "*" {
            return if self.is_unrestricted() {
                ColumnAccess::Allowed
            } else {
                ColumnAccess::Denied
            };
        }
        if self.is_forbidden(column) {
            return ColumnAccess::Denied;
        }
        if !self.allowed_columns().is_empty() && !self.is_explicitly_allowed(column) {
            return ColumnAccess::Denied;
        }
        ColumnAccess::Allowed
    }
}

/// Resolve `column` of `table` under `policy`.
pub fn resolve_column(table: &str, column: &str, policy: &SqlSelectPolicy) -> ColumnAccess {
    match policy.column_rule(table) {
        Some(rule) => rule.check(column),
        None => ColumnAccess::Allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy_with(rule: SqlColumnAccessPolicy) -> SqlSelectPolicy {
        SqlSelectPolicy::builder()
            .allow_table("public.ventas")
            .column_rule("public.ventas", rule)
            .build()
            .unwrap()
    }

    #[test]
    fn forbidden_wins_over_allowed() {
        let policy = policy_with(SqlColumnAccessPolicy::new(["salario"], ["salario"]));
        assert_eq!(
            resolve_column("public.ventas", "salario", &policy),
            ColumnAccess::Denied
        );
    }

    #[test]
    fn allow_list_restricts_columns() {
        let policy = policy_with(SqlColumnAccessPolicy::allow(["monto", "fecha"]));
        assert!(resolve_column("public.ventas", "monto", &policy).is_allowed());
        assert!(resolve_column("public.ventas", "FECHA", &policy).is_allowed());
        assert!(!resolve_column("public.ventas", "vendedor", &policy).is_allowed());
    }

    #[test]
    fn empty_allow_list_allows_unlisted_columns() {
        let policy = policy_with(SqlColumnAccessPolicy::forbid(["salario"]));
        assert!(resolve_column("public.ventas", "monto", &policy).is_allowed());
        assert!(!resolve_column("public.ventas", "Salario", &policy).is_allowed());
    }

    #[test]
    fn table_without_rule_allows_everything() {
        let policy = policy_with(SqlColumnAccessPolicy::forbid(["salario"]));
        assert!(resolve_column("public.clientes", "salario", &policy).is_allowed());
        assert!(resolve_column("public.clientes", "*", &policy).is_allowed());
    }

    #[test]
    fn wildcard_denied_when_any_restriction_exists() {
        let forbid = policy_with(SqlColumnAccessPolicy::forbid(["salario"]));
        assert_eq!(
            resolve_column("public.ventas", "*", &forbid),
            ColumnAccess::Denied
        );

        let allow = policy_with(SqlColumnAccessPolicy::allow(["monto"]));
        assert_eq!(
            resolve_column("public.ventas", "*", &allow),
            ColumnAccess::Denied
        );

        let open = policy_with(SqlColumnAccessPolicy::default());
        assert_eq!(
            resolve_column("public.ventas", "*", &open),
            ColumnAccess::Allowed
        );
    }

    proptest! {
        #[test]
        fn forbidden_column_always_denied(
            column in "[a-z_][a-z0-9_]{0,12}",
            allowed in proptest::collection::vec("[a-z_][a-z0-9_]{0,12}", 0..6),
            also_allow in any::<bool>(),
        ) {
            let mut allowed = allowed;
            if also_allow {
                allowed.push(column.clone());
            }
            let policy = policy_with(SqlColumnAccessPolicy::new(allowed, [column.clone()]));
            prop_assert_eq!(
                resolve_column("public.ventas", &column, &policy),
                ColumnAccess::Denied
            );
            prop_assert_eq!(
                resolve_column("PUBLIC.VENTAS", &column.to_ascii_uppercase(), &policy),
                ColumnAccess::Denied
            );
        }
    }
}
