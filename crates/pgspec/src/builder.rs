//! Draft SELECT statement and its compiler.
//!
//! A [`QueryBuilder`] is created empty by [`create_builder`], seeded by a query's
//! `source` function, extended by filter rules, and finally consumed by
//! [`QueryBuilder::compile`], which folds in the criteria's sort and LIMIT/OFFSET and
//! produces a [`CompiledQuery`].
//!
//! Mutators take `&mut self` and return `&mut Self`, so a builder is owned by exactly
//! one compilation pass and is never shared between executions.
//!
//! # Example
//! ```ignore
//! use pgspec::{Condition, SortDir, create_builder};
//!
//! let mut qb = create_builder();
//! qb.from("users", "u")
//!     .left_join("profiles", "p", Condition::eq_field("p.user_id", "u.id"))
//!     .column("u.id")
//!     .column_as("p.display_name", "name")
//!     .where_(Condition::eq("u.status", "active"))
//!     .order_by("u.created_at", SortDir::Desc);
//!
//! let compiled = qb.build()?;
//! // SELECT u.id, p.display_name AS name FROM users u
//! //   LEFT JOIN profiles p ON p.user_id = u.id
//! //   WHERE u.status = $1 ORDER BY u.created_at DESC
//! ```

use crate::condition::{Condition, Expr, Raw, unescape};
use crate::criteria::{QueryCriteria, SortDir};
use crate::error::{SpecError, SpecResult};
use crate::field::Field;
use crate::ident::split_dotted;
use crate::param::ParamList;
use crate::sql::SqlWriter;
use tokio_postgres::types::ToSql;

/// Join flavour for a non-FROM source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

#[derive(Debug, Clone)]
enum SourceKind {
    From,
    Join { kind: JoinKind, on: Condition },
}

#[derive(Debug, Clone)]
struct Source {
    table: String,
    alias: Option<String>,
    kind: SourceKind,
}

#[derive(Debug, Clone)]
struct Column {
    expr: Expr,
    alias: Option<String>,
}

#[derive(Debug, Clone)]
struct OrderItem {
    expr: Expr,
    dir: SortDir,
}

/// Mutable draft of a SELECT statement.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    sources: Vec<Source>,
    columns: Vec<Column>,
    distinct: bool,
    conditions: Vec<Condition>,
    group_by: Vec<Expr>,
    order: Vec<OrderItem>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Create an empty builder.
pub fn create_builder() -> QueryBuilder {
    QueryBuilder::new()
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a literal SQL fragment; see [`crate::condition::unescape`].
    pub fn unescape(sql: impl Into<String>) -> Raw {
        unescape(sql)
    }

    // ==================== Sources ====================

    /// Add a FROM source with an alias. A second `from` becomes `, table alias`.
    pub fn from(&mut self, table: &str, alias: &str) -> &mut Self {
        self.push_source(table, Some(alias), SourceKind::From)
    }

    /// Add a FROM source without an alias.
    pub fn from_table(&mut self, table: &str) -> &mut Self {
        self.push_source(table, None, SourceKind::From)
    }

    /// Add INNER JOIN.
    pub fn inner_join(&mut self, table: &str, alias: &str, on: Condition) -> &mut Self {
        self.join(JoinKind::Inner, table, alias, on)
    }

    /// Add LEFT JOIN.
    pub fn left_join(&mut self, table: &str, alias: &str, on: Condition) -> &mut Self {
        self.join(JoinKind::Left, table, alias, on)
    }

    /// Add RIGHT JOIN.
    pub fn right_join(&mut self, table: &str, alias: &str, on: Condition) -> &mut Self {
        self.join(JoinKind::Right, table, alias, on)
    }

    /// Add FULL OUTER JOIN.
    pub fn full_join(&mut self, table: &str, alias: &str, on: Condition) -> &mut Self {
        self.join(JoinKind::Full, table, alias, on)
    }

    pub fn join(&mut self, kind: JoinKind, table: &str, alias: &str, on: Condition) -> &mut Self {
        self.push_source(table, Some(alias), SourceKind::Join { kind, on })
    }

    fn push_source(&mut self, table: &str, alias: Option<&str>, kind: SourceKind) -> &mut Self {
        self.sources.push(Source {
            table: table.to_string(),
            alias: alias.filter(|a| !a.is_empty()).map(str::to_string),
            kind,
        });
        self
    }

    /// Whether a FROM source has been attached.
    pub fn has_source(&self) -> bool {
        self.sources
            .iter()
            .any(|s| matches!(s.kind, SourceKind::From))
    }

    // ==================== Columns ====================

    /// Append a projected column or expression. With no columns the statement selects `*`.
    pub fn column(&mut self, expr: impl Into<Expr>) -> &mut Self {
        self.columns.push(Column {
            expr: expr.into(),
            alias: None,
        });
        self
    }

    /// Append a projected column or expression with an output alias.
    pub fn column_as(&mut self, expr: impl Into<Expr>, alias: &str) -> &mut Self {
        self.columns.push(Column {
            expr: expr.into(),
            alias: Some(alias.to_string()),
        });
        self
    }

    /// Append several plain columns.
    pub fn columns<I, E>(&mut self, exprs: I) -> &mut Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        for expr in exprs {
            self.column(expr);
        }
        self
    }

    /// SELECT DISTINCT.
    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    // ==================== Filtering ====================

    /// AND a condition onto the WHERE clause. Repeated calls accumulate.
    pub fn where_(&mut self, cond: impl Into<Condition>) -> &mut Self {
        self.conditions.push(cond.into());
        self
    }

    /// AND `field = value` onto the WHERE clause.
    pub fn where_eq<T: ToSql + Send + Sync + 'static>(&mut self, field: impl Into<Field>, value: T) -> &mut Self {
        self.where_(Condition::eq(field, value))
    }

    /// Number of top-level WHERE conditions added so far.
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    // ==================== Grouping & ordering ====================

    pub fn group_by(&mut self, expr: impl Into<Expr>) -> &mut Self {
        self.group_by.push(expr.into());
        self
    }

    /// Add ORDER BY field.
    pub fn order_by(&mut self, field: impl Into<Field>, dir: SortDir) -> &mut Self {
        self.order_by_expr(Expr::Field(field.into()), dir)
    }

    /// Add ORDER BY over an arbitrary expression.
    pub fn order_by_expr(&mut self, expr: impl Into<Expr>, dir: SortDir) -> &mut Self {
        self.order.push(OrderItem {
            expr: expr.into(),
            dir,
        });
        self
    }

    // ==================== LIMIT / OFFSET ====================

    /// Set LIMIT. Criteria `take` overrides it at compile time.
    pub fn limit(&mut self, n: i64) -> &mut Self {
        self.limit = Some(n);
        self
    }

    /// Set OFFSET. Criteria `skip` overrides it at compile time.
    pub fn offset(&mut self, n: i64) -> &mut Self {
        self.offset = Some(n);
        self
    }

    // ==================== Compilation ====================

    /// Compile without criteria.
    pub fn build(self) -> SpecResult<CompiledQuery> {
        self.compile(&QueryCriteria::default())
    }

    /// Fold the criteria into the statement and compile it.
    ///
    /// Criteria sort entries are appended after the builder's own ordering and must name
    /// a single column; `take`/`skip` become LIMIT/OFFSET when set.
    pub fn compile(mut self, criteria: &QueryCriteria) -> SpecResult<CompiledQuery> {
        for sort in &criteria.sort {
            let field = Field::parse(&sort.field);
            if field.name() == "*" {
                return Err(SpecError::compile(format!(
                    "cannot sort by wildcard '{}'",
                    sort.field
                )));
            }
            self.order.push(OrderItem {
                expr: Expr::Field(field),
                dir: sort.direction,
            });
        }
        if let Some(take) = criteria.take {
            self.limit = Some(take);
        }
        if let Some(skip) = criteria.skip {
            self.offset = Some(skip);
        }

        let mut w = SqlWriter::new();
        self.write_sql(&mut w)?;
        let (sql, params) = w.finish();
        Ok(CompiledQuery { sql, params })
    }

    /// Write the statement as it stands. Also used for subqueries, which share the
    /// outer statement's parameter numbering.
    pub(crate) fn write_sql(&self, w: &mut SqlWriter) -> SpecResult<()> {
        let Some(first) = self.sources.first() else {
            return Err(SpecError::compile("query has no FROM source"));
        };
        if !matches!(first.kind, SourceKind::From) {
            return Err(SpecError::compile(format!(
                "join on '{}' appears before any FROM source",
                first.table
            )));
        }

        w.push(if self.distinct { "SELECT DISTINCT " } else { "SELECT " });
        if self.columns.is_empty() {
            w.push("*");
        }
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            col.expr.write_sql(w)?;
            if let Some(alias) = &col.alias {
                w.push(" AS ");
                w.push_ident(alias)?;
            }
        }

        w.push(" FROM ");
        for (i, source) in self.sources.iter().enumerate() {
            match &source.kind {
                SourceKind::From => {
                    if i > 0 {
                        w.push(", ");
                    }
                    write_source(source, w)?;
                }
                SourceKind::Join { kind, on } => {
                    w.push(" ").push(kind.as_sql()).push(" ");
                    write_source(source, w)?;
                    w.push(" ON ");
                    on.write_sql(w)?;
                }
            }
        }

        if !self.conditions.is_empty() {
            w.push(" WHERE ");
            if let [only] = self.conditions.as_slice() {
                only.write_sql(w)?;
            } else {
                for (i, cond) in self.conditions.iter().enumerate() {
                    if i > 0 {
                        w.push(" AND ");
                    }
                    cond.write_operand(w)?;
                }
            }
        }

        if !self.group_by.is_empty() {
            w.push(" GROUP BY ");
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                expr.write_sql(w)?;
            }
        }

        if !self.order.is_empty() {
            w.push(" ORDER BY ");
            for (i, item) in self.order.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                item.expr.write_sql(w)?;
                w.push(" ").push(item.dir.as_sql());
            }
        }

        if let Some(limit) = self.limit {
            if limit < 0 {
                return Err(SpecError::compile(format!("LIMIT must be >= 0, got {limit}")));
            }
            w.push(" LIMIT ").push_int(limit);
        }
        if let Some(offset) = self.offset {
            if offset < 0 {
                return Err(SpecError::compile(format!("OFFSET must be >= 0, got {offset}")));
            }
            w.push(" OFFSET ").push_int(offset);
        }

        Ok(())
    }
}

fn write_source(source: &Source, w: &mut SqlWriter) -> SpecResult<()> {
    for (i, segment) in split_dotted(&source.table).into_iter().enumerate() {
        if i > 0 {
            w.push(".");
        }
        w.push_ident(segment)?;
    }
    if let Some(alias) = &source.alias {
        w.push(" ");
        w.push_ident(alias)?;
    }
    Ok(())
}

/// SQL text plus the parameters bound to its `$n` placeholders, in order.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: ParamList,
}

impl CompiledQuery {
    /// Parameters as references compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.as_refs()
    }
}

#[cfg(test)]
mod tests;
