//! The query guard.
//!
//! [`SqlGuard::validate`] runs the policy checks in a fixed order and stops
//! at the first violation, so the same request against the same policy
//! always yields the same verdict.

use crate::columns::resolve_column;
use crate::keywords::find_forbidden_keyword;
use crate::policy::SqlSelectPolicy;
use querygate_core::{
    Clause, ColumnRef, JoinClause, PolicyViolation, RequestedLimit, StructuredQueryRequest, ident,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The outcome of validating a structured query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Run the query with this LIMIT.
    Allow { effective_limit: u32 },
    /// Do not run the query.
    Deny { violation: PolicyViolation },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow { .. })
    }

    pub fn effective_limit(&self) -> Option<u32> {
        match self {
            Verdict::Allow { effective_limit } => Some(*effective_limit),
            Verdict::Deny { .. } => None,
        }
    }

    pub fn violation(&self) -> Option<&PolicyViolation> {
        match self {
            Verdict::Allow { .. } => None,
            Verdict::Deny { violation } => Some(violation),
        }
    }
}

impl From<Result<u32, PolicyViolation>> for Verdict {
    fn from(result: Result<u32, PolicyViolation>) -> Self {
        match result {
            Ok(effective_limit) => Verdict::Allow { effective_limit },
            Err(violation) => Verdict::Deny { violation },
        }
    }
}

/// Stateless SELECT validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlGuard;

impl SqlGuard {
    /// Validate `request` against `policy`.
    ///
    /// Checks, in order: tables (each join is checked against the join
    /// flags before its table is allow-listed), columns, aggregations,
    /// GROUP BY / ORDER BY / WHERE flags, forbidden WHERE keywords, LIMIT.
    pub fn validate(request: &StructuredQueryRequest, policy: &SqlSelectPolicy) -> Verdict {
        let verdict = Verdict::from(Self::check(request, policy));
        match &verdict {
            Verdict::Allow { effective_limit } => {
                debug!(
                    table = %request.table,
                    effective_limit,
                    "Query ALLOWED"
                );
            }
            Verdict::Deny { violation } => {
                warn!(
                    table = %request.table,
                    kind = %violation.kind(),
                    "Query DENIED: {violation}"
                );
            }
        }
        verdict
    }

    fn check(
        request: &StructuredQueryRequest,
        policy: &SqlSelectPolicy,
    ) -> Result<u32, PolicyViolation> {
        let scope = Self::check_tables(request, policy)?;
        Self::check_columns(request, &scope, policy)?;
        Self::check_aggregations(request, policy)?;
        Self::check_clauses(request, policy)?;
        Self::check_keywords(request, policy)?;
        Self::resolve_limit(request.limit.as_ref(), policy)
    }

    // ── 1. Tables ──────────────────────────────────────────────────

    fn check_tables<'r>(
        request: &'r StructuredQueryRequest,
        policy: &SqlSelectPolicy,
    ) -> Result<Vec<ScopedTable<'r>>, PolicyViolation> {
        let mut scope = Vec::with_capacity(request.joins.len() + 1);

        let primary = policy
            .allowed_table(&request.table)
            .ok_or_else(|| PolicyViolation::TableNotAllowed {
                table: request.table.clone(),
            })?;
        scope.push(ScopedTable {
            name: primary.to_string(),
            alias: None,
        });

        for join in &request.joins {
            Self::check_join(join, policy)?;
            let joined = policy
                .allowed_table(&join.table)
                .ok_or_else(|| PolicyViolation::TableNotAllowed {
                    table: join.table.clone(),
                })?;
            scope.push(ScopedTable {
                name: joined.to_string(),
                alias: join.alias.as_deref(),
            });
        }
        Ok(scope)
    }

    // ── 2. Columns ─────────────────────────────────────────────────

    fn check_columns(
        request: &StructuredQueryRequest,
        scope: &[ScopedTable<'_>],
        policy: &SqlSelectPolicy,
    ) -> Result<(), PolicyViolation> {
        for column in request.column_references() {
            for table in Self::tables_for(column, scope)? {
                if !resolve_column(&table.name, &column.name, policy).is_allowed() {
                    return Err(PolicyViolation::ColumnForbidden {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Tables a column reference may belong to.
    ///
    /// A qualified reference resolves through aliases and table names. An
    /// unqualified one could come from any table in scope, so it must be
    /// allowed by all of them.
    fn tables_for<'s, 'r>(
        column: &ColumnRef,
        scope: &'s [ScopedTable<'r>],
    ) -> Result<Vec<&'s ScopedTable<'r>>, PolicyViolation> {
        let Some(qualifier) = &column.qualifier else {
            return Ok(scope.iter().collect());
        };

        let by_alias: Vec<_> = scope
            .iter()
            .filter(|t| t.alias.is_some_and(|a| ident::eq(a, qualifier)))
            .collect();
        if !by_alias.is_empty() {
            return Ok(by_alias);
        }

        let by_name: Vec<_> = scope
            .iter()
            .filter(|t| ident::names_table(qualifier, &t.name))
            .collect();
        if by_name.is_empty() {
            return Err(PolicyViolation::TableNotAllowed {
                table: qualifier.clone(),
            });
        }
        Ok(by_name)
    }

    // ── 3. Joins ───────────────────────────────────────────────────

    /// Runs from the table check, so a disabled or disallowed join is
    /// reported as such even when its table is not allow-listed.
    fn check_join(join: &JoinClause, policy: &SqlSelectPolicy) -> Result<(), PolicyViolation> {
        if !policy.allow_joins() || !policy.is_join_type_allowed(&join.join_type) {
            return Err(PolicyViolation::JoinNotAllowed {
                join_type: crate::normalize_join_type(&join.join_type),
            });
        }
        Ok(())
    }

    // ── 4. Aggregations ────────────────────────────────────────────

    fn check_aggregations(
        request: &StructuredQueryRequest,
        policy: &SqlSelectPolicy,
    ) -> Result<(), PolicyViolation> {
        for aggregation in &request.aggregations {
            if !policy.allow_aggregations()
                || !policy.is_aggregation_allowed(&aggregation.function)
            {
                return Err(PolicyViolation::AggregationNotAllowed {
                    function: aggregation.function.trim().to_uppercase(),
                });
            }
        }
        Ok(())
    }

    // ── 5. Optional clauses ────────────────────────────────────────

    fn check_clauses(
        request: &StructuredQueryRequest,
        policy: &SqlSelectPolicy,
    ) -> Result<(), PolicyViolation> {
        let gated = [
            (Clause::GroupBy, !request.group_by.is_empty(), policy.allow_group_by()),
            (Clause::OrderBy, !request.order_by.is_empty(), policy.allow_order_by()),
            (Clause::Where, request.where_clause.is_some(), policy.allow_where_clauses()),
        ];
        for (clause, used, allowed) in gated {
            if used && !allowed {
                return Err(PolicyViolation::ClauseNotAllowed { clause });
            }
        }
        Ok(())
    }

    // ── 6. Forbidden keywords ──────────────────────────────────────

    fn check_keywords(
        request: &StructuredQueryRequest,
        policy: &SqlSelectPolicy,
    ) -> Result<(), PolicyViolation> {
        let Some(where_clause) = &request.where_clause else {
            return Ok(());
        };
        let forbidden = policy.forbidden_keywords_in_where();
        match find_forbidden_keyword(&where_clause.expression, forbidden) {
            Some(keyword) => Err(PolicyViolation::ForbiddenKeyword {
                keyword: keyword.to_string(),
            }),
            None => Ok(()),
        }
    }

    // ── 7. LIMIT ───────────────────────────────────────────────────

    /// Missing → default; in-range integer → as is; out of range → clamped
    /// to `[1, max]`; negative, fractional or non-numeric → denied.
    fn resolve_limit(
        requested: Option<&RequestedLimit>,
        policy: &SqlSelectPolicy,
    ) -> Result<u32, PolicyViolation> {
        let invalid = || PolicyViolation::InvalidLimit {
            raw: requested.map(ToString::to_string).unwrap_or_default(),
        };

        let value: i64 = match requested {
            None => return Ok(policy.default_select_limit()),
            Some(RequestedLimit::Integer(n)) => *n,
            Some(RequestedLimit::Float(x)) => {
                if !x.is_finite() || x.fract() != 0.0 {
                    return Err(invalid());
                }
                if *x >= i64::MAX as f64 {
                    i64::MAX
                } else {
                    *x as i64
                }
            }
            Some(RequestedLimit::Text(s)) => parse_text_limit(s).ok_or_else(invalid)?,
        };

        if value < 0 {
            return Err(invalid());
        }
        let max = policy.max_select_limit();
        Ok(u32::try_from(value).unwrap_or(max).clamp(1, max))
    }
}

/// A decimal integer, saturating at `i64::MAX` for digit strings too long
/// to fit.
fn parse_text_limit(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(i64::MAX)
}

/// A table a query reads from, with its alias.
#[derive(Debug)]
struct ScopedTable<'r> {
    name: String,
    alias: Option<&'r str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqlColumnAccessPolicy;
    use proptest::prelude::*;
    use querygate_core::ViolationKind;

    /// Sales table with a forbidden salary column.
    fn ventas_policy() -> SqlSelectPolicy {
        SqlSelectPolicy::from_json(
            r#"{
                "default_select_limit": 10,
                "max_select_limit": 50,
                "allowed_tables_for_select": ["public.ventas"],
                "column_access_rules": [
                    {"table_name": "public.ventas",
                     "column_policy": {"allowed_columns": [], "forbidden_columns": ["salario"]}}
                ]
            }"#,
        )
        .unwrap()
    }

    fn permissive_policy() -> SqlSelectPolicy {
        SqlSelectPolicy::builder()
            .limits(10, 50)
            .allow_tables(["public.ventas", "public.clientes", "hr.empleados"])
            .allow_joins(true)
            .join_types(["INNER", "LEFT"])
            .allow_aggregations(true)
            .aggregation_functions(["COUNT", "SUM", "AVG"])
            .allow_group_by(true)
            .allow_order_by(true)
            .allow_where_clauses(true)
            .forbid_keywords(["TRUNCATE", "UNION SELECT", ";"])
            .column_rule("public.ventas", SqlColumnAccessPolicy::forbid(["salario"]))
            .column_rule("hr.empleados", SqlColumnAccessPolicy::allow(["id", "nombre"]))
            .build()
            .unwrap()
    }

    fn kind(verdict: &Verdict) -> Option<ViolationKind> {
        verdict.violation().map(PolicyViolation::kind)
    }

    #[test]
    fn allowed_column_gets_default_limit() {
        let req = StructuredQueryRequest::select("public.ventas", ["monto"]);
        assert_eq!(
            SqlGuard::validate(&req, &ventas_policy()),
            Verdict::Allow { effective_limit: 10 }
        );
    }

    #[test]
    fn forbidden_column_denied() {
        let req = StructuredQueryRequest::select("public.ventas", ["salario"]);
        let verdict = SqlGuard::validate(&req, &ventas_policy());
        assert_eq!(
            verdict,
            Verdict::Deny {
                violation: PolicyViolation::ColumnForbidden {
                    table: "public.ventas".into(),
                    column: "salario".into(),
                }
            }
        );
    }

    #[test]
    fn unknown_table_denied_first() {
        let req = StructuredQueryRequest::select("public.nomina", ["salario"])
            .limit(RequestedLimit::Integer(-1));
        let verdict = SqlGuard::validate(&req, &ventas_policy());
        assert_eq!(
            verdict.violation(),
            Some(&PolicyViolation::TableNotAllowed {
                table: "public.nomina".into()
            })
        );
    }

    #[test]
    fn join_denied_when_joins_disabled_even_with_types() {
        let policy = SqlSelectPolicy::builder()
            .allow_tables(["public.ventas", "public.clientes"])
            .allow_joins(false)
            .join_types(["INNER", "LEFT"])
            .build()
            .unwrap();
        let req = StructuredQueryRequest::select("public.ventas", ["monto"]).join(
            "INNER",
            "public.clientes",
            &["ventas.cliente_id", "clientes.id"],
        );
        assert_eq!(
            SqlGuard::validate(&req, &policy).violation(),
            Some(&PolicyViolation::JoinNotAllowed {
                join_type: "INNER".into()
            })
        );
    }

    #[test]
    fn disabled_join_reported_before_joined_table_allow_list() {
        let policy = SqlSelectPolicy::builder()
            .allow_table("public.ventas")
            .allow_joins(false)
            .build()
            .unwrap();
        let req = StructuredQueryRequest::select("public.ventas", ["monto"]).join(
            "INNER",
            "public.clientes",
            &["ventas.cliente_id", "clientes.id"],
        );
        assert_eq!(
            SqlGuard::validate(&req, &policy).violation(),
            Some(&PolicyViolation::JoinNotAllowed {
                join_type: "INNER".into()
            })
        );
    }

    #[test]
    fn join_type_must_be_listed() {
        let req = StructuredQueryRequest::select("public.ventas", ["ventas.monto"]).join(
            "full outer join",
            "public.clientes",
            &["ventas.cliente_id", "clientes.id"],
        );
        assert_eq!(
            SqlGuard::validate(&req, &permissive_policy()).violation(),
            Some(&PolicyViolation::JoinNotAllowed {
                join_type: "FULL OUTER".into()
            })
        );
    }

    #[test]
    fn joined_table_must_be_allowed() {
        let req = StructuredQueryRequest::select("public.ventas", ["monto"]).join(
            "INNER",
            "public.nomina",
            &["ventas.id", "nomina.venta_id"],
        );
        assert_eq!(
            SqlGuard::validate(&req, &permissive_policy()).violation(),
            Some(&PolicyViolation::TableNotAllowed {
                table: "public.nomina".into()
            })
        );
    }

    #[test]
    fn allowed_join_passes() {
        let req =
            StructuredQueryRequest::select("public.ventas", ["ventas.monto", "clientes.nombre"])
                .join("left join", "public.clientes", &["ventas.cliente_id", "clientes.id"]);
        assert!(SqlGuard::validate(&req, &permissive_policy()).is_allowed());
    }

    #[test]
    fn unqualified_column_checked_against_every_joined_table() {
        // `salario` is forbidden on ventas; unqualified it could come from there.
        let req = StructuredQueryRequest::select("public.clientes", ["salario"])
            .join("INNER", "public.ventas", &["clientes.id", "ventas.cliente_id"]);
        assert_eq!(
            SqlGuard::validate(&req, &permissive_policy()).violation(),
            Some(&PolicyViolation::ColumnForbidden {
                table: "public.ventas".into(),
                column: "salario".into(),
            })
        );
    }

    #[test]
    fn qualified_column_resolves_through_alias() {
        let mut req = StructuredQueryRequest::select("public.ventas", ["e.nombre", "e.sueldo"])
            .join("INNER", "hr.empleados", &["ventas.vendedor_id", "e.id"]);
        req.joins[0].alias = Some("e".into());
        assert_eq!(
            SqlGuard::validate(&req, &permissive_policy()).violation(),
            Some(&PolicyViolation::ColumnForbidden {
                table: "hr.empleados".into(),
                column: "sueldo".into(),
            })
        );
    }

    #[test]
    fn unknown_qualifier_is_table_violation() {
        let req = StructuredQueryRequest::select("public.ventas", ["nomina.total"]);
        assert_eq!(
            SqlGuard::validate(&req, &permissive_policy()).violation(),
            Some(&PolicyViolation::TableNotAllowed {
                table: "nomina".into()
            })
        );
    }

    #[test]
    fn wildcard_on_restricted_table_denied() {
        let req = StructuredQueryRequest::select("public.ventas", ["*"]);
        assert_eq!(
            kind(&SqlGuard::validate(&req, &ventas_policy())),
            Some(ViolationKind::ColumnForbidden)
        );
    }

    #[test]
    fn aggregation_checks() {
        let count_star = StructuredQueryRequest::select("public.clientes", Vec::<&str>::new())
            .aggregate("count", None);
        assert!(SqlGuard::validate(&count_star, &permissive_policy()).is_allowed());

        let max = StructuredQueryRequest::select("public.clientes", Vec::<&str>::new())
            .aggregate("max", Some("edad"));
        assert_eq!(
            SqlGuard::validate(&max, &permissive_policy()).violation(),
            Some(&PolicyViolation::AggregationNotAllowed {
                function: "MAX".into()
            })
        );

        let disabled = StructuredQueryRequest::select("public.ventas", Vec::<&str>::new())
            .aggregate("SUM", Some("monto"));
        assert_eq!(
            kind(&SqlGuard::validate(&disabled, &ventas_policy())),
            Some(ViolationKind::AggregationNotAllowed)
        );
    }

    #[test]
    fn aggregated_column_still_checked() {
        let req = StructuredQueryRequest::select("public.ventas", Vec::<&str>::new())
            .aggregate("SUM", Some("salario"));
        assert_eq!(
            kind(&SqlGuard::validate(&req, &permissive_policy())),
            Some(ViolationKind::ColumnForbidden)
        );
    }

    #[test]
    fn clause_flags_checked_in_order() {
        let req = StructuredQueryRequest::select("public.ventas", ["monto"])
            .filter("monto > 10", &["monto"])
            .order_by("monto", true)
            .group_by(&["monto"]);
        assert_eq!(
            SqlGuard::validate(&req, &ventas_policy()).violation(),
            Some(&PolicyViolation::ClauseNotAllowed {
                clause: Clause::GroupBy
            })
        );

        let order_only =
            StructuredQueryRequest::select("public.ventas", ["monto"]).order_by("monto", false);
        assert_eq!(
            SqlGuard::validate(&order_only, &ventas_policy()).violation(),
            Some(&PolicyViolation::ClauseNotAllowed {
                clause: Clause::OrderBy
            })
        );

        let where_only = StructuredQueryRequest::select("public.ventas", ["monto"])
            .filter("monto > 1", &["monto"]);
        assert_eq!(
            SqlGuard::validate(&where_only, &ventas_policy()).violation(),
            Some(&PolicyViolation::ClauseNotAllowed {
                clause: Clause::Where
            })
        );
    }

    #[test]
    fn drop_in_where_denied_even_when_where_allowed() {
        let req = StructuredQueryRequest::select("public.ventas", ["monto"])
            .filter("monto > 10; DROP TABLE public.ventas", &["monto"]);
        assert_eq!(
            SqlGuard::validate(&req, &permissive_policy()).violation(),
            Some(&PolicyViolation::ForbiddenKeyword {
                keyword: ";".into()
            })
        );

        let policy = SqlSelectPolicy::builder()
            .allow_table("public.ventas")
            .allow_where_clauses(true)
            .build()
            .unwrap();
        let req = StructuredQueryRequest::select("public.ventas", ["monto"])
            .filter("monto > 10 or drop", &["monto"]);
        assert_eq!(
            SqlGuard::validate(&req, &policy).violation(),
            Some(&PolicyViolation::ForbiddenKeyword {
                keyword: "DROP".into()
            })
        );
    }

    #[test]
    fn non_ascii_keyword_denied_in_any_case() {
        let policy = SqlSelectPolicy::builder()
            .allow_table("public.ventas")
            .allow_where_clauses(true)
            .forbid_keywords(["contraseña"])
            .build()
            .unwrap();
        for expression in ["CONTRASEÑA = 'x'", "contraseña = 'x'", "Contraseña = 'x'"] {
            let req = StructuredQueryRequest::select("public.ventas", ["monto"])
                .filter(expression, &["monto"]);
            assert_eq!(
                SqlGuard::validate(&req, &policy).violation(),
                Some(&PolicyViolation::ForbiddenKeyword {
                    keyword: "CONTRASEÑA".into()
                }),
                "{expression}"
            );
        }
    }

    #[test]
    fn where_columns_checked() {
        let req = StructuredQueryRequest::select("public.ventas", ["monto"])
            .filter("salario > 1000", &["salario"]);
        assert_eq!(
            kind(&SqlGuard::validate(&req, &permissive_policy())),
            Some(ViolationKind::ColumnForbidden)
        );
    }

    #[test]
    fn limit_resolution() {
        let policy = ventas_policy();
        let with = |limit: RequestedLimit| {
            let req = StructuredQueryRequest::select("public.ventas", ["monto"]).limit(limit);
            SqlGuard::validate(&req, &policy)
        };

        assert_eq!(with(RequestedLimit::Integer(20)).effective_limit(), Some(20));
        assert_eq!(with(RequestedLimit::Integer(500)).effective_limit(), Some(50));
        assert_eq!(with(RequestedLimit::Integer(0)).effective_limit(), Some(1));
        assert_eq!(with(RequestedLimit::Text(" 30 ".into())).effective_limit(), Some(30));
        assert_eq!(with(RequestedLimit::Float(25.0)).effective_limit(), Some(25));
        assert_eq!(with(RequestedLimit::Integer(i64::MAX)).effective_limit(), Some(50));
    }

    #[test]
    fn oversized_numeric_limits_clamp_to_max() {
        let policy = ventas_policy();
        let with = |limit: RequestedLimit| {
            let req = StructuredQueryRequest::select("public.ventas", ["monto"]).limit(limit);
            SqlGuard::validate(&req, &policy)
        };

        let huge = "99999999999999999999";
        assert_eq!(with(RequestedLimit::Text(huge.into())).effective_limit(), Some(50));
        assert_eq!(with(RequestedLimit::Float(1e20)).effective_limit(), Some(50));
        assert_eq!(
            kind(&with(RequestedLimit::Text(format!("-{huge}")))),
            Some(ViolationKind::InvalidLimit)
        );
        assert_eq!(
            kind(&with(RequestedLimit::Text("9999999999999999999x".into()))),
            Some(ViolationKind::InvalidLimit)
        );
    }

    #[test]
    fn negative_limit_denied_not_clamped() {
        let req = StructuredQueryRequest::select("public.ventas", ["monto"])
            .limit(RequestedLimit::Integer(-5));
        assert_eq!(
            SqlGuard::validate(&req, &ventas_policy()),
            Verdict::Deny {
                violation: PolicyViolation::InvalidLimit { raw: "-5".into() }
            }
        );
    }

    #[test]
    fn non_numeric_and_fractional_limits_denied() {
        for limit in [
            RequestedLimit::Text("ten".into()),
            RequestedLimit::Text("-3".into()),
            RequestedLimit::Float(2.5),
            RequestedLimit::Float(f64::NAN),
        ] {
            let req = StructuredQueryRequest::select("public.ventas", ["monto"]).limit(limit);
            assert_eq!(
                kind(&SqlGuard::validate(&req, &ventas_policy())),
                Some(ViolationKind::InvalidLimit)
            );
        }
    }

    #[test]
    fn verdict_serialization() {
        let allow = Verdict::Allow { effective_limit: 10 };
        let json = serde_json::to_value(&allow).unwrap();
        assert_eq!(json["verdict"], "allow");
        assert_eq!(json["effective_limit"], 10);

        let deny = Verdict::Deny {
            violation: PolicyViolation::ForbiddenKeyword {
                keyword: "DROP".into(),
            },
        };
        let json = serde_json::to_value(&deny).unwrap();
        assert_eq!(json["verdict"], "deny");
        assert_eq!(json["violation"]["kind"], "forbidden_keyword");
    }

    #[test]
    fn json_roundtrip_yields_identical_verdicts() {
        let corpus = vec![
            StructuredQueryRequest::select("public.ventas", ["monto"]),
            StructuredQueryRequest::select("public.ventas", ["salario"]),
            StructuredQueryRequest::select("public.nomina", ["x"]),
            StructuredQueryRequest::select("public.ventas", ["ventas.monto"])
                .join("LEFT", "public.clientes", &["ventas.cliente_id", "clientes.id"]),
            StructuredQueryRequest::select("public.ventas", ["monto"])
                .filter("monto > 1 union select 1", &["monto"]),
            StructuredQueryRequest::select("public.ventas", ["monto"])
                .limit(RequestedLimit::Integer(75)),
            StructuredQueryRequest::select("hr.empleados", ["id", "nombre"])
                .order_by("nombre", false),
            StructuredQueryRequest::select("hr.empleados", ["sueldo"]),
        ];

        let original = permissive_policy();
        let json = serde_json::to_string(&original).unwrap();
        let reloaded: SqlSelectPolicy = serde_json::from_str(&json).unwrap();

        for request in &corpus {
            assert_eq!(
                SqlGuard::validate(request, &original),
                SqlGuard::validate(request, &reloaded),
                "diverged on {request:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn allowed_limit_always_within_bounds(
            default in 1u32..100,
            extra in 0u32..1000,
            requested in proptest::option::of(any::<i64>()),
        ) {
            let max = default + extra;
            let policy = SqlSelectPolicy::builder()
                .limits(default, max)
                .allow_table("public.ventas")
                .build()
                .unwrap();
            let mut req = StructuredQueryRequest::select("public.ventas", ["monto"]);
            req.limit = requested.map(RequestedLimit::Integer);

            match SqlGuard::validate(&req, &policy) {
                Verdict::Allow { effective_limit } => {
                    prop_assert!(effective_limit >= 1 && effective_limit <= max);
                }
                Verdict::Deny { violation } => {
                    prop_assert_eq!(violation.kind(), ViolationKind::InvalidLimit);
                    prop_assert!(requested.is_some_and(|n| n < 0));
                }
            }
        }

        #[test]
        fn forbidden_keyword_never_passes(
            allow_joins in any::<bool>(),
            allow_aggregations in any::<bool>(),
            allow_group_by in any::<bool>(),
            allow_order_by in any::<bool>(),
            keyword_index in 0usize..4,
            prefix in "[a-z ]{0,10}",
            suffix in "[a-z ]{0,10}",
            lowercase in any::<bool>(),
        ) {
            let policy = SqlSelectPolicy::builder()
                .allow_table("public.ventas")
                .allow_joins(allow_joins)
                .allow_aggregations(allow_aggregations)
                .allow_group_by(allow_group_by)
                .allow_order_by(allow_order_by)
                .allow_where_clauses(true)
                .build()
                .unwrap();
            let keyword = crate::KEYWORD_SAFETY_FLOOR[keyword_index];
            let keyword = if lowercase {
                keyword.to_ascii_lowercase()
            } else {
                keyword.to_string()
            };
            let expression = format!("{prefix} ({keyword}) {suffix}");
            let req = StructuredQueryRequest::select("public.ventas", ["monto"])
                .filter(&expression, &["monto"]);

            let verdict = SqlGuard::validate(&req, &policy);
            prop_assert_eq!(kind(&verdict), Some(ViolationKind::ForbiddenKeyword));
        }
    }
}
