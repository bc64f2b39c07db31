//! Per-call query criteria: filters, sort, and paging.
//!
//! Criteria usually arrive from an outer layer as JSON, so everything here is
//! `serde`-friendly (`noPagination`, `asc`/`desc`):
//!
//! ```ignore
//! let criteria: QueryCriteria = serde_json::from_str(r#"{
//!     "filters": { "status": "active", "roles": ["admin", "owner"] },
//!     "sort": [{ "field": "u.created_at", "direction": "desc" }],
//!     "page": 2,
//!     "rows": 25
//! }"#)?;
//! ```

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDir {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// One criteria-supplied ORDER BY entry. `field` is validated as an identifier at
/// compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub direction: SortDir,
}

impl SortField {
    pub fn new(field: impl Into<String>, direction: SortDir) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// A dynamically typed filter value handed to a rule.
///
/// Implements [`ToSql`], so a rule may bind it directly: integers adapt to
/// `int2`/`int4`/`int8`/`float` columns, floats to `float4`/`float8`, lists to arrays.
/// Any other pairing of variant and parameter type fails with [`WrongType`](tokio_postgres::types::WrongType).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FilterValue>),
    Map(BTreeMap<String, FilterValue>),
}

impl FilterValue {
    /// Null, `""`, `[]` and `{}` count as "no filter".
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Null => true,
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::List(items) => items.is_empty(),
            FilterValue::Map(map) => map.is_empty(),
            FilterValue::Bool(_) | FilterValue::Int(_) | FilterValue::Float(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FilterValue::Int(n) => Some(*n),
            FilterValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Float(n) => Some(*n),
            FilterValue::Int(n) => Some(*n as f64),
            FilterValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FilterValue::Bool(b) => Some(*b),
            FilterValue::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FilterValue]> {
        match self {
            FilterValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key of an object value, e.g. `{ "from": .., "to": .. }` range filters.
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        match self {
            FilterValue::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        FilterValue::Int(n.into())
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Int(n)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Float(n)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl ToSql for FilterValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            FilterValue::Null => Ok(IsNull::Yes),
            FilterValue::Bool(b) => b.to_sql_checked(ty, out),
            FilterValue::Int(n) if *ty == Type::INT2 => i16::try_from(*n)?.to_sql_checked(ty, out),
            FilterValue::Int(n) if *ty == Type::INT4 => i32::try_from(*n)?.to_sql_checked(ty, out),
            FilterValue::Int(n) if *ty == Type::FLOAT4 => (*n as f32).to_sql_checked(ty, out),
            FilterValue::Int(n) if *ty == Type::FLOAT8 => (*n as f64).to_sql_checked(ty, out),
            FilterValue::Int(n) => n.to_sql_checked(ty, out),
            FilterValue::Float(n) if *ty == Type::FLOAT4 => (*n as f32).to_sql_checked(ty, out),
            FilterValue::Float(n) => n.to_sql_checked(ty, out),
            FilterValue::Text(s) => s.to_sql_checked(ty, out),
            FilterValue::List(items) => items.to_sql_checked(ty, out),
            FilterValue::Map(_) => Err(format!("cannot bind an object filter value as {ty}").into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        if let Kind::Array(member) = ty.kind() {
            return Self::accepts(member);
        }
        <bool as ToSql>::accepts(ty)
            || <i64 as ToSql>::accepts(ty)
            || <i32 as ToSql>::accepts(ty)
            || <i16 as ToSql>::accepts(ty)
            || <f64 as ToSql>::accepts(ty)
            || <f32 as ToSql>::accepts(ty)
            || <String as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

/// Filters, sort and paging for one query invocation.
///
/// Middleware may rewrite `take`/`skip`/`page`/`rows` before the query runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryCriteria {
    /// Rule name to value. Keys without a matching rule are handled per the query's
    /// unknown-filter policy.
    pub filters: BTreeMap<String, FilterValue>,
    pub sort: Vec<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Rows per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<i64>,
    pub no_pagination: bool,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a filter value for a rule.
    pub fn filter(mut self, rule: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(rule.into(), value.into());
        self
    }

    /// Append a sort entry.
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDir) -> Self {
        self.sort.push(SortField::new(field, direction));
        self
    }

    pub fn take(mut self, n: i64) -> Self {
        self.take = Some(n);
        self
    }

    pub fn skip(mut self, n: i64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn rows(mut self, rows: i64) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Opt out of paging middleware.
    pub fn no_pagination(mut self) -> Self {
        self.no_pagination = true;
        self
    }

    /// Filters whose values are present and non-empty, in key order.
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.filters
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v))
    }
}
