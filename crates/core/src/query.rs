//! Structured SELECT requests.
//!
//! The text-to-SQL layer parses the agent's query into this shape before it
//! reaches the guard. Nothing here is validated: a request is an untrusted,
//! per-turn value that lives only until a verdict is produced.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A column reference, optionally qualified by a table name or alias.
///
/// Serialized as a plain string: `"monto"`, `"v.monto"`,
/// `"public.ventas.monto"`. The part after the last `.` is the column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// `*` or `t.*`.
    pub fn is_wildcard(&self) -> bool {
        self.name.trim() == "*"
    }
}

impl From<String> for ColumnRef {
    fn from(s: String) -> Self {
        match s.rsplit_once('.') {
            Some((qualifier, name)) if !qualifier.is_empty() => {
                ColumnRef::qualified(qualifier.trim(), name.trim())
            }
            _ => ColumnRef::new(s.trim()),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        ColumnRef::from(s.to_string())
    }
}

impl From<ColumnRef> for String {
    fn from(c: ColumnRef) -> Self {
        c.to_string()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A JOIN against another table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    /// Join type as written by the parser (`INNER`, `left`, `LEFT OUTER JOIN`).
    pub join_type: String,
    /// Fully-qualified joined table.
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Columns referenced by the `ON` condition.
    #[serde(default)]
    pub on_columns: Vec<ColumnRef>,
}

/// An aggregate function call in the select list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: String,
    /// `None` for `COUNT(*)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnRef>,
}

/// A WHERE clause: the raw predicate text plus the columns it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub expression: String,
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: ColumnRef,
    #[serde(default)]
    pub descending: bool,
}

/// The LIMIT an agent asked for, exactly as it arrived.
///
/// Negative, fractional and non-numeric values must reach the guard so it
/// can deny them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestedLimit {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for RequestedLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedLimit::Integer(n) => write!(f, "{n}"),
            RequestedLimit::Float(x) => write!(f, "{x}"),
            RequestedLimit::Text(s) => f.write_str(s),
        }
    }
}

/// A parsed SELECT against a single primary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQueryRequest {
    /// Fully-qualified primary table (`schema.table`).
    pub table: String,

    #[serde(default)]
    pub columns: Vec<ColumnRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<Aggregation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<ColumnRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<RequestedLimit>,
}

impl StructuredQueryRequest {
    /// `SELECT <columns> FROM <table>`.
    pub fn select<I, C>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            joins: Vec::new(),
            aggregations: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn join(mut self, join_type: &str, table: &str, on_columns: &[&str]) -> Self {
        self.joins.push(JoinClause {
            join_type: join_type.into(),
            table: table.into(),
            alias: None,
            on_columns: on_columns.iter().map(|c| ColumnRef::from(*c)).collect(),
        });
        self
    }

    pub fn aggregate(mut self, function: &str, column: Option<&str>) -> Self {
        self.aggregations.push(Aggregation {
            function: function.into(),
            column: column.map(ColumnRef::from),
        });
        self
    }

    pub fn filter(mut self, expression: &str, columns: &[&str]) -> Self {
        self.where_clause = Some(WhereClause {
            expression: expression.into(),
            columns: columns.iter().map(|c| ColumnRef::from(*c)).collect(),
        });
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by
            .extend(columns.iter().map(|c| ColumnRef::from(*c)));
        self
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: RequestedLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn has_join(&self) -> bool {
        !self.joins.is_empty()
    }

    /// Every column the query touches, in evaluation order: select list,
    /// aggregation arguments, join conditions, WHERE, GROUP BY, ORDER BY.
    pub fn column_references(&self) -> Vec<&ColumnRef> {
        let mut refs: Vec<&ColumnRef> = self.columns.iter().collect();
        refs.extend(self.aggregations.iter().filter_map(|a| a.column.as_ref()));
        refs.extend(self.joins.iter().flat_map(|j| j.on_columns.iter()));
        if let Some(w) = &self.where_clause {
            refs.extend(w.columns.iter());
        }
        refs.extend(self.group_by.iter());
        refs.extend(self.order_by.iter().map(|o| &o.column));
        refs
    }
}
