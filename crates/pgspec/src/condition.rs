//! Boolean condition trees and scalar expressions.
//!
//! [`Condition`] is the WHERE/ON vocabulary: comparisons, `IN`, `BETWEEN`, null checks,
//! `EXISTS`, AND/OR/NOT groups and raw fragments. [`Expr`] is what sits on either side
//! of a comparison or in a projection: fields, bound values, `COALESCE`, `CASE WHEN`,
//! function calls, scalar subqueries and raw fragments.
//!
//! Every value that is not a [`Raw`] fragment is bound as a parameter when the tree is
//! written, in the order it is encountered (depth-first, left to right).
//!
//! # Example
//! ```ignore
//! use pgspec::condition::{self, Condition};
//!
//! let cond = condition::and([
//!     Condition::eq("u.status", "active"),
//!     condition::or([
//!         Condition::eq("u.role", "admin"),
//!         Condition::gte("u.reputation", 100_i32),
//!     ]),
//! ]);
//! // (u.status = $1 AND (u.role = $2 OR u.reputation >= $3))
//! ```

use crate::builder::QueryBuilder;
use crate::error::{SpecError, SpecResult};
use crate::field::Field;
use crate::param::Param;
use crate::sql::SqlWriter;
use tokio_postgres::types::ToSql;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    /// Case-insensitive LIKE (PostgreSQL ILIKE)
    Ilike,
    NotLike,
    NotIlike,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::Ilike => "ILIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::NotIlike => "NOT ILIKE",
        }
    }
}

/// A caller-trusted SQL fragment, spliced into the text verbatim and never bound.
///
/// **Warning**: this bypasses parameterization. Only use it with hardcoded SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw(pub(crate) String);

/// Wrap a literal SQL fragment so it is emitted as-is.
///
/// This is the only way to put unparameterized text into a statement; the caller is
/// responsible for its safety.
pub fn unescape(sql: impl Into<String>) -> Raw {
    Raw(sql.into())
}

// ==================== Expr ====================

/// A scalar expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column reference.
    Field(Field),
    /// Bound value (`$n`).
    Value(Param),
    /// Raw SQL (escape hatch).
    Raw(String),
    /// `COALESCE(a, b, ...)`; needs at least one argument.
    Coalesce(Vec<Expr>),
    /// `CASE WHEN .. THEN .. [ELSE ..] END`; needs at least one branch.
    Case {
        branches: Vec<(Condition, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    /// Function call with a validated name, e.g. `lower(u.email)`.
    Func { name: String, args: Vec<Expr> },
    /// Scalar subquery.
    Subquery(Box<QueryBuilder>),
}

impl Expr {
    pub fn field(field: impl Into<Field>) -> Self {
        Expr::Field(field.into())
    }

    pub fn value<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Expr::Value(Param::new(value))
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    pub fn func(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Func {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn subquery(query: QueryBuilder) -> Self {
        Expr::Subquery(Box::new(query))
    }

    pub(crate) fn write_sql(&self, w: &mut SqlWriter) -> SpecResult<()> {
        match self {
            Expr::Field(field) => {
                w.push_field(field)?;
            }
            Expr::Value(param) => {
                w.push_bind(param.clone());
            }
            Expr::Raw(sql) => {
                w.push(sql);
            }
            Expr::Coalesce(args) => {
                if args.is_empty() {
                    return Err(SpecError::compile("COALESCE requires at least one argument"));
                }
                w.push("COALESCE(");
                write_list(args, w)?;
                w.push(")");
            }
            Expr::Case {
                branches,
                otherwise,
            } => {
                if branches.is_empty() {
                    return Err(SpecError::compile("CASE requires at least one WHEN branch"));
                }
                w.push("CASE");
                for (when, then) in branches {
                    w.push(" WHEN ");
                    when.write_sql(w)?;
                    w.push(" THEN ");
                    then.write_sql(w)?;
                }
                if let Some(otherwise) = otherwise {
                    w.push(" ELSE ");
                    otherwise.write_sql(w)?;
                }
                w.push(" END");
            }
            Expr::Func { name, args } => {
                w.push_ident(name)?;
                w.push("(");
                write_list(args, w)?;
                w.push(")");
            }
            Expr::Subquery(query) => {
                w.push("(");
                query.write_sql(w)?;
                w.push(")");
            }
        }
        Ok(())
    }
}

fn write_list(exprs: &[Expr], w: &mut SqlWriter) -> SpecResult<()> {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        expr.write_sql(w)?;
    }
    Ok(())
}

impl From<Field> for Expr {
    fn from(field: Field) -> Self {
        Expr::Field(field)
    }
}

/// Strings name columns. Use [`Expr::value`] to bind a string value.
impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Field(Field::parse(s))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Field(Field::parse(&s))
    }
}

impl From<Raw> for Expr {
    fn from(raw: Raw) -> Self {
        Expr::Raw(raw.0)
    }
}

impl From<Param> for Expr {
    fn from(param: Param) -> Self {
        Expr::Value(param)
    }
}

impl From<QueryBuilder> for Expr {
    fn from(query: QueryBuilder) -> Self {
        Expr::subquery(query)
    }
}

/// `COALESCE(exprs...)`
pub fn coalesce(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Coalesce(exprs.into_iter().collect())
}

/// Start a `CASE WHEN` expression.
///
/// ```ignore
/// let tier = case_when(Condition::gte("score", 90_i32), Expr::value("gold"))
///     .when(Condition::gte("score", 50_i32), Expr::value("silver"))
///     .otherwise(Expr::value("bronze"));
/// ```
pub fn case_when(when: Condition, then: impl Into<Expr>) -> CaseWhen {
    CaseWhen {
        branches: vec![(when, then.into())],
    }
}

/// Builder for [`Expr::Case`].
#[derive(Debug, Clone)]
pub struct CaseWhen {
    branches: Vec<(Condition, Expr)>,
}

impl CaseWhen {
    pub fn when(mut self, when: Condition, then: impl Into<Expr>) -> Self {
        self.branches.push((when, then.into()));
        self
    }

    pub fn otherwise(self, value: impl Into<Expr>) -> Expr {
        Expr::Case {
            branches: self.branches,
            otherwise: Some(Box::new(value.into())),
        }
    }

    pub fn end(self) -> Expr {
        Expr::Case {
            branches: self.branches,
            otherwise: None,
        }
    }
}

impl From<CaseWhen> for Expr {
    fn from(case: CaseWhen) -> Self {
        case.end()
    }
}

// ==================== Condition ====================

/// A node of a boolean expression tree.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `left op right`
    Compare {
        left: Expr,
        op: CompareOp,
        right: Expr,
    },
    /// `expr [NOT] IN (values...)`. An empty list renders `FALSE` (`TRUE` when negated).
    In {
        expr: Expr,
        values: Vec<Expr>,
        negated: bool,
    },
    /// `expr [NOT] IN (SELECT ...)`
    InSubquery {
        expr: Expr,
        query: Box<QueryBuilder>,
        negated: bool,
    },
    /// `expr [NOT] BETWEEN low AND high`
    Between {
        expr: Expr,
        low: Expr,
        high: Expr,
        negated: bool,
    },
    /// `expr IS [NOT] NULL`
    Null { expr: Expr, negated: bool },
    /// All children must hold; must not be empty.
    And(Vec<Condition>),
    /// At least one child must hold; must not be empty.
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// `[NOT] EXISTS (SELECT ...)`
    Exists {
        query: Box<QueryBuilder>,
        negated: bool,
    },
    /// Raw SQL (escape hatch).
    Raw(String),
}

fn cmp<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, op: CompareOp, value: T) -> Condition {
    Condition::Compare {
        left: Expr::Field(field.into()),
        op,
        right: Expr::value(value),
    }
}

impl Condition {
    /// Generic comparison between two expressions.
    pub fn compare(left: impl Into<Expr>, op: CompareOp, right: impl Into<Expr>) -> Self {
        Condition::Compare {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    /// Column-to-column equality, the usual join condition: `a = b`.
    pub fn eq_field(a: impl Into<Field>, b: impl Into<Field>) -> Self {
        Condition::Compare {
            left: Expr::Field(a.into()),
            op: CompareOp::Eq,
            right: Expr::Field(b.into()),
        }
    }

    /// field = value
    pub fn eq<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, value: T) -> Self {
        cmp(field, CompareOp::Eq, value)
    }

    /// field != value
    pub fn ne<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, value: T) -> Self {
        cmp(field, CompareOp::Ne, value)
    }

    /// field > value
    pub fn gt<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, value: T) -> Self {
        cmp(field, CompareOp::Gt, value)
    }

    /// field >= value
    pub fn gte<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, value: T) -> Self {
        cmp(field, CompareOp::Gte, value)
    }

    /// field < value
    pub fn lt<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, value: T) -> Self {
        cmp(field, CompareOp::Lt, value)
    }

    /// field <= value
    pub fn lte<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, value: T) -> Self {
        cmp(field, CompareOp::Lte, value)
    }

    /// field LIKE pattern
    pub fn like<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, pattern: T) -> Self {
        cmp(field, CompareOp::Like, pattern)
    }

    /// field ILIKE pattern
    pub fn ilike<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, pattern: T) -> Self {
        cmp(field, CompareOp::Ilike, pattern)
    }

    /// field NOT LIKE pattern
    pub fn not_like<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, pattern: T) -> Self {
        cmp(field, CompareOp::NotLike, pattern)
    }

    /// field NOT ILIKE pattern
    pub fn not_ilike<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, pattern: T) -> Self {
        cmp(field, CompareOp::NotIlike, pattern)
    }

    /// field IN (values...)
    pub fn in_list<T: ToSql + Send + Sync + 'static>(
        field: impl Into<Field>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Condition::In {
            expr: Expr::Field(field.into()),
            values: values.into_iter().map(Expr::value).collect(),
            negated: false,
        }
    }

    /// field NOT IN (values...)
    pub fn not_in<T: ToSql + Send + Sync + 'static>(
        field: impl Into<Field>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Condition::In {
            expr: Expr::Field(field.into()),
            values: values.into_iter().map(Expr::value).collect(),
            negated: true,
        }
    }

    /// field IN (SELECT ...)
    pub fn in_subquery(field: impl Into<Field>, query: QueryBuilder) -> Self {
        Condition::InSubquery {
            expr: Expr::Field(field.into()),
            query: Box::new(query),
            negated: false,
        }
    }

    /// field NOT IN (SELECT ...)
    pub fn not_in_subquery(field: impl Into<Field>, query: QueryBuilder) -> Self {
        Condition::InSubquery {
            expr: Expr::Field(field.into()),
            query: Box::new(query),
            negated: true,
        }
    }

    /// field BETWEEN low AND high
    pub fn between<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, low: T, high: T) -> Self {
        Condition::Between {
            expr: Expr::Field(field.into()),
            low: Expr::value(low),
            high: Expr::value(high),
            negated: false,
        }
    }

    /// field NOT BETWEEN low AND high
    pub fn not_between<T: ToSql + Send + Sync + 'static>(field: impl Into<Field>, low: T, high: T) -> Self {
        Condition::Between {
            expr: Expr::Field(field.into()),
            low: Expr::value(low),
            high: Expr::value(high),
            negated: true,
        }
    }

    /// expr IS NULL
    pub fn is_null(expr: impl Into<Expr>) -> Self {
        Condition::Null {
            expr: expr.into(),
            negated: false,
        }
    }

    /// expr IS NOT NULL
    pub fn is_not_null(expr: impl Into<Expr>) -> Self {
        Condition::Null {
            expr: expr.into(),
            negated: true,
        }
    }

    /// EXISTS (SELECT ...)
    pub fn exists(query: QueryBuilder) -> Self {
        Condition::Exists {
            query: Box::new(query),
            negated: false,
        }
    }

    /// NOT EXISTS (SELECT ...)
    pub fn not_exists(query: QueryBuilder) -> Self {
        Condition::Exists {
            query: Box::new(query),
            negated: true,
        }
    }

    /// Negate a condition.
    #[allow(clippy::should_implement_trait)]
    pub fn not(cond: Condition) -> Self {
        Condition::Not(Box::new(cond))
    }

    /// Raw SQL condition (escape hatch).
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    /// Combine with another condition using AND, flattening into an existing AND group.
    pub fn and_with(self, other: Condition) -> Condition {
        match self {
            Condition::And(mut conds) => {
                conds.push(other);
                Condition::And(conds)
            }
            _ => Condition::And(vec![self, other]),
        }
    }

    /// Combine with another condition using OR, flattening into an existing OR group.
    pub fn or_with(self, other: Condition) -> Condition {
        match self {
            Condition::Or(mut conds) => {
                conds.push(other);
                Condition::Or(conds)
            }
            _ => Condition::Or(vec![self, other]),
        }
    }

    /// Write this condition. Groups with more than one child are parenthesized.
    pub(crate) fn write_sql(&self, w: &mut SqlWriter) -> SpecResult<()> {
        match self {
            Condition::Compare { left, op, right } => {
                left.write_sql(w)?;
                w.push(" ").push(op.as_sql()).push(" ");
                right.write_sql(w)?;
            }
            Condition::In {
                expr,
                values,
                negated,
            } => {
                if values.is_empty() {
                    w.push(if *negated { "TRUE" } else { "FALSE" });
                    return Ok(());
                }
                expr.write_sql(w)?;
                w.push(if *negated { " NOT IN (" } else { " IN (" });
                write_list(values, w)?;
                w.push(")");
            }
            Condition::InSubquery {
                expr,
                query,
                negated,
            } => {
                expr.write_sql(w)?;
                w.push(if *negated { " NOT IN (" } else { " IN (" });
                query.write_sql(w)?;
                w.push(")");
            }
            Condition::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.write_sql(w)?;
                w.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                low.write_sql(w)?;
                w.push(" AND ");
                high.write_sql(w)?;
            }
            Condition::Null { expr, negated } => {
                expr.write_sql(w)?;
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Condition::And(conds) => write_group(conds, " AND ", "AND", w)?,
            Condition::Or(conds) => write_group(conds, " OR ", "OR", w)?,
            Condition::Not(inner) => {
                w.push("NOT (");
                inner.write_sql(w)?;
                w.push(")");
            }
            Condition::Exists { query, negated } => {
                w.push(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                query.write_sql(w)?;
                w.push(")");
            }
            Condition::Raw(sql) => {
                w.push(sql);
            }
        }
        Ok(())
    }

    /// Write as one operand of an AND/OR chain. Raw text may carry its own OR, so it
    /// gets parentheses here.
    pub(crate) fn write_operand(&self, w: &mut SqlWriter) -> SpecResult<()> {
        match self {
            Condition::Raw(sql) => {
                w.push("(").push(sql).push(")");
                Ok(())
            }
            _ => self.write_sql(w),
        }
    }
}

fn write_group(conds: &[Condition], sep: &str, name: &str, w: &mut SqlWriter) -> SpecResult<()> {
    match conds {
        [] => Err(SpecError::compile(format!("empty {name} group"))),
        [only] => only.write_sql(w),
        _ => {
            w.push("(");
            for (i, cond) in conds.iter().enumerate() {
                if i > 0 {
                    w.push(sep);
                }
                cond.write_operand(w)?;
            }
            w.push(")");
            Ok(())
        }
    }
}

impl From<Raw> for Condition {
    fn from(raw: Raw) -> Self {
        Condition::Raw(raw.0)
    }
}

/// AND of all given conditions.
pub fn and(conds: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::And(conds.into_iter().collect())
}

/// OR of all given conditions.
pub fn or(conds: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Or(conds.into_iter().collect())
}
