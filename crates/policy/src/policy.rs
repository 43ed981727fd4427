//! Policy data model: the declarative SELECT policy of one context.
//!
//! A [`SqlSelectPolicy`] is immutable once built. It can only be obtained
//! through [`SqlSelectPolicyBuilder::build`] or by deserializing a
//! [`SqlSelectPolicyDocument`], and both paths run the same validation.

use crate::{PolicyError, PolicyResult};
use querygate_core::ident;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Keywords that are always forbidden in a WHERE clause, whatever the
/// policy document says.
pub const KEYWORD_SAFETY_FLOOR: [&str; 4] = ["DELETE", "UPDATE", "INSERT", "DROP"];

/// Canonical spelling of a join type: upper-case, single spaces, no
/// trailing `JOIN` (`"left outer join"` → `"LEFT OUTER"`).
pub fn normalize_join_type(join_type: &str) -> String {
    let mut words: Vec<String> = join_type
        .split_whitespace()
        .map(|w| w.to_uppercase())
        .collect();
    if words.len() > 1 && words.last().is_some_and(|w| w == "JOIN") {
        words.pop();
    }
    words.join(" ")
}

fn normalize_keyword(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_function(function: &str) -> String {
    function.trim().to_uppercase()
}

// ── Column access rules ────────────────────────────────────────────

/// Column allow/deny lists for one table.
///
/// An empty allow-list means "no explicit allow-list": every column that is
/// not forbidden is allowed. A column in both lists is denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnPolicyDocument", into = "ColumnPolicyDocument")]
pub struct SqlColumnAccessPolicy {
    allowed_columns: BTreeSet<String>,
    forbidden_columns: BTreeSet<String>,
}

impl SqlColumnAccessPolicy {
    pub fn new<A, F>(allowed: A, forbidden: F) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        Self {
            allowed_columns: allowed
                .into_iter()
                .map(|c| ident::normalize(c.as_ref()))
                .filter(|c| !c.is_empty())
                .collect(),
            forbidden_columns: forbidden
                .into_iter()
                .map(|c| ident::normalize(c.as_ref()))
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// Only a deny-list.
    pub fn forbid<F>(forbidden: F) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        Self::new(std::iter::empty::<&str>(), forbidden)
    }

    /// Only an allow-list.
    pub fn allow<A>(allowed: A) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        Self::new(allowed, std::iter::empty::<&str>())
    }

    pub fn allowed_columns(&self) -> &BTreeSet<String> {
        &self.allowed_columns
    }

    pub fn forbidden_columns(&self) -> &BTreeSet<String> {
        &self.forbidden_columns
    }

    pub fn is_forbidden(&self, column: &str) -> bool {
        self.forbidden_columns.contains(&ident::normalize(column))
    }

    pub fn is_explicitly_allowed(&self, column: &str) -> bool {
        self.allowed_columns.contains(&ident::normalize(column))
    }

    /// Neither list has entries.
    pub fn is_unrestricted(&self) -> bool {
        self.allowed_columns.is_empty() && self.forbidden_columns.is_empty()
    }

    /// Columns listed as both allowed and forbidden.
    pub fn conflicts(&self) -> Vec<&str> {
        self.allowed_columns
            .intersection(&self.forbidden_columns)
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ColumnPolicyDocument {
    #[serde(default)]
    allowed_columns: Vec<String>,
    #[serde(default)]
    forbidden_columns: Vec<String>,
}

impl From<ColumnPolicyDocument> for SqlColumnAccessPolicy {
    fn from(doc: ColumnPolicyDocument) -> Self {
        SqlColumnAccessPolicy::new(doc.allowed_columns, doc.forbidden_columns)
    }
}

impl From<SqlColumnAccessPolicy> for ColumnPolicyDocument {
    fn from(policy: SqlColumnAccessPolicy) -> Self {
        ColumnPolicyDocument {
            allowed_columns: policy.allowed_columns.into_iter().collect(),
            forbidden_columns: policy.forbidden_columns.into_iter().collect(),
        }
    }
}

// ── SELECT policy ──────────────────────────────────────────────────

/// The SELECT safety policy of one database-query context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SqlSelectPolicyDocument", into = "SqlSelectPolicyDocument")]
pub struct SqlSelectPolicy {
    default_select_limit: u32,
    max_select_limit: u32,
    allow_joins: bool,
    allowed_join_types: BTreeSet<String>,
    allow_aggregations: bool,
    allowed_aggregation_functions: BTreeSet<String>,
    allow_group_by: bool,
    allow_order_by: bool,
    allow_where_clauses: bool,
    forbidden_keywords_in_where: BTreeSet<String>,
    allowed_tables_for_select: Vec<String>,
    /// Keyed by normalized table name.
    column_access_rules: BTreeMap<String, SqlColumnAccessPolicy>,
    llm_instructions_for_select: Vec<String>,
}

impl SqlSelectPolicy {
    pub fn builder() -> SqlSelectPolicyBuilder {
        SqlSelectPolicyBuilder::new()
    }

    /// Parse and validate a policy from its JSON document form.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        let doc: SqlSelectPolicyDocument = serde_json::from_str(json)?;
        Self::try_from(doc)
    }

    pub fn default_select_limit(&self) -> u32 {
        self.default_select_limit
    }

    pub fn max_select_limit(&self) -> u32 {
        self.max_select_limit
    }

    pub fn allow_joins(&self) -> bool {
        self.allow_joins
    }

    pub fn allowed_join_types(&self) -> &BTreeSet<String> {
        &self.allowed_join_types
    }

    pub fn allow_aggregations(&self) -> bool {
        self.allow_aggregations
    }

    pub fn allowed_aggregation_functions(&self) -> &BTreeSet<String> {
        &self.allowed_aggregation_functions
    }

    pub fn allow_group_by(&self) -> bool {
        self.allow_group_by
    }

    pub fn allow_order_by(&self) -> bool {
        self.allow_order_by
    }

    pub fn allow_where_clauses(&self) -> bool {
        self.allow_where_clauses
    }

    /// Upper-cased forbidden keywords, always including the safety floor.
    pub fn forbidden_keywords_in_where(&self) -> &BTreeSet<String> {
        &self.forbidden_keywords_in_where
    }

    pub fn allowed_tables_for_select(&self) -> &[String] {
        &self.allowed_tables_for_select
    }

    pub fn llm_instructions_for_select(&self) -> &[String] {
        &self.llm_instructions_for_select
    }

    /// Iterate `(normalized table name, rule)` pairs.
    pub fn column_access_rules(&self) -> impl Iterator<Item = (&str, &SqlColumnAccessPolicy)> {
        self.column_access_rules
            .iter()
            .map(|(table, rule)| (table.as_str(), rule))
    }

    /// The column rule configured for `table`, if any.
    pub fn column_rule(&self, table: &str) -> Option<&SqlColumnAccessPolicy> {
        self.column_access_rules.get(&ident::normalize(table))
    }

    /// The allow-listed spelling of `table`, if it is allowed.
    ///
    /// Matching is exact up to case: `ventas` does not match `public.ventas`.
    pub fn allowed_table(&self, table: &str) -> Option<&str> {
        self.allowed_tables_for_select
            .iter()
            .find(|t| ident::eq(t, table))
            .map(String::as_str)
    }

    pub fn is_table_allowed(&self, table: &str) -> bool {
        self.allowed_table(table).is_some()
    }

    pub fn is_join_type_allowed(&self, join_type: &str) -> bool {
        self.allowed_join_types
            .contains(&normalize_join_type(join_type))
    }

    pub fn is_aggregation_allowed(&self, function: &str) -> bool {
        self.allowed_aggregation_functions
            .contains(&normalize_function(function))
    }

    /// Render the policy as a prompt section for the text-to-SQL agent.
    ///
    /// Advisory only: the guard enforces the policy whatever the agent does
    /// with this text.
    pub fn prompt_section(&self) -> String {
        fn on_off(flag: bool) -> &'static str {
            if flag { "allowed" } else { "not allowed" }
        }
        fn listed(flag: bool, items: &BTreeSet<String>) -> String {
            if !flag {
                "not allowed".to_string()
            } else if items.is_empty() {
                "allowed, but no types are enabled".to_string()
            } else {
                format!(
                    "allowed ({})",
                    items.iter().cloned().collect::<Vec<_>>().join(", ")
                )
            }
        }

        let mut lines = vec!["SQL SELECT policy:".to_string()];
        lines.push(format!(
            "- Allowed tables: {}",
            if self.allowed_tables_for_select.is_empty() {
                "(none)".to_string()
            } else {
                self.allowed_tables_for_select.join(", ")
            }
        ));
        lines.push(format!(
            "- LIMIT: default {}, maximum {}",
            self.default_select_limit, self.max_select_limit
        ));
        lines.push(format!(
            "- JOIN: {}",
            listed(self.allow_joins, &self.allowed_join_types)
        ));
        lines.push(format!(
            "- Aggregations: {}",
            listed(self.allow_aggregations, &self.allowed_aggregation_functions)
        ));
        lines.push(format!("- GROUP BY: {}", on_off(self.allow_group_by)));
        lines.push(format!("- ORDER BY: {}", on_off(self.allow_order_by)));
        lines.push(format!("- WHERE: {}", on_off(self.allow_where_clauses)));

        for (table, rule) in &self.column_access_rules {
            if !rule.allowed_columns.is_empty() {
                lines.push(format!(
                    "- {table}: only columns {}",
                    rule.allowed_columns.iter().cloned().collect::<Vec<_>>().join(", ")
                ));
            }
            if !rule.forbidden_columns.is_empty() {
                lines.push(format!(
                    "- {table}: never select {}",
                    rule.forbidden_columns.iter().cloned().collect::<Vec<_>>().join(", ")
                ));
            }
        }

        if !self.llm_instructions_for_select.is_empty() {
            lines.push("Instructions:".to_string());
            for instruction in &self.llm_instructions_for_select {
                lines.push(format!("- {instruction}"));
            }
        }
        lines.join("\n")
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Step-by-step construction of a validated [`SqlSelectPolicy`].
///
/// Everything defaults to "deny": no tables, no joins, no aggregations, no
/// optional clauses.
#[derive(Debug, Clone)]
pub struct SqlSelectPolicyBuilder {
    default_select_limit: u32,
    max_select_limit: u32,
    allow_joins: bool,
    allowed_join_types: Vec<String>,
    allow_aggregations: bool,
    allowed_aggregation_functions: Vec<String>,
    allow_group_by: bool,
    allow_order_by: bool,
    allow_where_clauses: bool,
    forbidden_keywords_in_where: Vec<String>,
    allowed_tables_for_select: Vec<String>,
    column_access_rules: Vec<(String, SqlColumnAccessPolicy)>,
    llm_instructions_for_select: Vec<String>,
}

impl Default for SqlSelectPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlSelectPolicyBuilder {
    pub fn new() -> Self {
        Self {
            default_select_limit: default_select_limit(),
            max_select_limit: default_max_select_limit(),
            allow_joins: false,
            allowed_join_types: Vec::new(),
            allow_aggregations: false,
            allowed_aggregation_functions: Vec::new(),
            allow_group_by: false,
            allow_order_by: false,
            allow_where_clauses: false,
            forbidden_keywords_in_where: Vec::new(),
            allowed_tables_for_select: Vec::new(),
            column_access_rules: Vec::new(),
            llm_instructions_for_select: Vec::new(),
        }
    }

    pub fn limits(mut self, default_select_limit: u32, max_select_limit: u32) -> Self {
        self.default_select_limit = default_select_limit;
        self.max_select_limit = max_select_limit;
        self
    }

    pub fn allow_joins(mut self, allow: bool) -> Self {
        self.allow_joins = allow;
        self
    }

    pub fn join_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_join_types
            .extend(types.into_iter().map(Into::into));
        self
    }

    pub fn allow_aggregations(mut self, allow: bool) -> Self {
        self.allow_aggregations = allow;
        self
    }

    pub fn aggregation_functions<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_aggregation_functions
            .extend(functions.into_iter().map(Into::into));
        self
    }

    pub fn allow_group_by(mut self, allow: bool) -> Self {
        self.allow_group_by = allow;
        self
    }

    pub fn allow_order_by(mut self, allow: bool) -> Self {
        self.allow_order_by = allow;
        self
    }

    pub fn allow_where_clauses(mut self, allow: bool) -> Self {
        self.allow_where_clauses = allow;
        self
    }

    pub fn forbid_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbidden_keywords_in_where
            .extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn allow_table(mut self, table: impl Into<String>) -> Self {
        self.allowed_tables_for_select.push(table.into());
        self
    }

    pub fn allow_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tables_for_select
            .extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn column_rule(mut self, table: impl Into<String>, rule: SqlColumnAccessPolicy) -> Self {
        self.column_access_rules.push((table.into(), rule));
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.llm_instructions_for_select.push(instruction.into());
        self
    }

    /// Validate and freeze the policy.
    pub fn build(self) -> PolicyResult<SqlSelectPolicy> {
        if self.default_select_limit == 0 || self.default_select_limit > self.max_select_limit {
            return Err(PolicyError::InvalidLimits {
                default: self.default_select_limit,
                max: self.max_select_limit,
            });
        }

        let mut allowed_tables: Vec<String> = Vec::new();
        for table in self.allowed_tables_for_select {
            let table = table.trim().to_string();
            if table.is_empty() {
                return Err(PolicyError::EmptyIdentifier("allowed_tables_for_select"));
            }
            if !allowed_tables.iter().any(|t| ident::eq(t, &table)) {
                allowed_tables.push(table);
            }
        }

        let mut rules = BTreeMap::new();
        for (table, rule) in self.column_access_rules {
            let key = ident::normalize(&table);
            if key.is_empty() {
                return Err(PolicyError::EmptyIdentifier("column_access_rules.table_name"));
            }
            // A rule nothing can look up would leave its forbidden columns open.
            if !allowed_tables.iter().any(|t| ident::eq(t, &key)) {
                return Err(PolicyError::ColumnRuleForUnknownTable(table));
            }
            let conflicts = rule.conflicts();
            if !conflicts.is_empty() {
                warn!(
                    table = %key,
                    columns = ?conflicts,
                    "Columns are both allowed and forbidden; they will be denied"
                );
            }
            if rules.insert(key, rule).is_some() {
                return Err(PolicyError::DuplicateColumnRule(table));
            }
        }

        let mut keywords: BTreeSet<String> = self
            .forbidden_keywords_in_where
            .iter()
            .map(|k| normalize_keyword(k))
            .filter(|k| !k.is_empty())
            .collect();
        keywords.extend(KEYWORD_SAFETY_FLOOR.iter().map(|k| k.to_string()));

        Ok(SqlSelectPolicy {
            default_select_limit: self.default_select_limit,
            max_select_limit: self.max_select_limit,
            allow_joins: self.allow_joins,
            allowed_join_types: self
                .allowed_join_types
                .iter()
                .map(|j| normalize_join_type(j))
                .filter(|j| !j.is_empty())
                .collect(),
            allow_aggregations: self.allow_aggregations,
            allowed_aggregation_functions: self
                .allowed_aggregation_functions
                .iter()
                .map(|f| normalize_function(f))
                .filter(|f| !f.is_empty())
                .collect(),
            allow_group_by: self.allow_group_by,
            allow_order_by: self.allow_order_by,
            allow_where_clauses: self.allow_where_clauses,
            forbidden_keywords_in_where: keywords,
            allowed_tables_for_select: allowed_tables,
            column_access_rules: rules,
            llm_instructions_for_select: self.llm_instructions_for_select,
        })
    }
}

// ── Wire document ──────────────────────────────────────────────────

fn default_select_limit() -> u32 {
    10
}
fn default_max_select_limit() -> u32 {
    100
}

/// One entry of `column_access_rules` as persisted by the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRuleDocument {
    pub table_name: String,
    #[serde(default)]
    pub column_policy: SqlColumnAccessPolicy,
}

/// The persisted JSON shape of a SELECT policy.
///
/// Missing flags default to `false` and missing lists to empty, so a
/// partial document is never more permissive than a complete one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlSelectPolicyDocument {
    #[serde(default = "default_select_limit")]
    pub default_select_limit: u32,
    #[serde(default = "default_max_select_limit")]
    pub max_select_limit: u32,
    #[serde(default)]
    pub allow_joins: bool,
    #[serde(default)]
    pub allowed_join_types: Vec<String>,
    #[serde(default)]
    pub allow_aggregations: bool,
    #[serde(default)]
    pub allowed_aggregation_functions: Vec<String>,
    #[serde(default)]
    pub allow_group_by: bool,
    #[serde(default)]
    pub allow_order_by: bool,
    #[serde(default)]
    pub allow_where_clauses: bool,
    #[serde(default)]
    pub forbidden_keywords_in_where: Vec<String>,
    #[serde(default)]
    pub allowed_tables_for_select: Vec<String>,
    #[serde(default)]
    pub column_access_rules: Vec<ColumnRuleDocument>,
    #[serde(default)]
    pub llm_instructions_for_select: Vec<String>,
}

impl TryFrom<SqlSelectPolicyDocument> for SqlSelectPolicy {
    type Error = PolicyError;

    fn try_from(doc: SqlSelectPolicyDocument) -> PolicyResult<Self> {
        let mut builder = SqlSelectPolicyBuilder::new()
            .limits(doc.default_select_limit, doc.max_select_limit)
            .allow_joins(doc.allow_joins)
            .join_types(doc.allowed_join_types)
            .allow_aggregations(doc.allow_aggregations)
            .aggregation_functions(doc.allowed_aggregation_functions)
            .allow_group_by(doc.allow_group_by)
            .allow_order_by(doc.allow_order_by)
            .allow_where_clauses(doc.allow_where_clauses)
            .forbid_keywords(doc.forbidden_keywords_in_where)
            .allow_tables(doc.allowed_tables_for_select);
        for rule in doc.column_access_rules {
            builder = builder.column_rule(rule.table_name, rule.column_policy);
        }
        for instruction in doc.llm_instructions_for_select {
            builder = builder.instruction(instruction);
        }
        builder.build()
    }
}

impl From<SqlSelectPolicy> for SqlSelectPolicyDocument {
    fn from(policy: SqlSelectPolicy) -> Self {
        SqlSelectPolicyDocument {
            default_select_limit: policy.default_select_limit,
            max_select_limit: policy.max_select_limit,
            allow_joins: policy.allow_joins,
            allowed_join_types: policy.allowed_join_types.into_iter().collect(),
            allow_aggregations: policy.allow_aggregations,
            allowed_aggregation_functions: policy
                .allowed_aggregation_functions
                .into_iter()
                .collect(),
            allow_group_by: policy.allow_group_by,
            allow_order_by: policy.allow_order_by,
            allow_where_clauses: policy.allow_where_clauses,
            forbidden_keywords_in_where: policy.forbidden_keywords_in_where.into_iter().collect(),
            allowed_tables_for_select: policy.allowed_tables_for_select,
            column_access_rules: policy
                .column_access_rules
                .into_iter()
                .map(|(table_name, column_policy)| ColumnRuleDocument {
                    table_name,
                    column_policy,
                })
                .collect(),
            llm_instructions_for_select: policy.llm_instructions_for_select,
        }
    }
}
