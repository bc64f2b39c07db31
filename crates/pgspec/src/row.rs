//! Row mapping traits and utilities.
//!
//! The driver returns rows exactly as the executor produced them; turning them into
//! application types is the caller's job, done through [`FromRow`].

use crate::error::{SpecError, SpecResult};
use tokio_postgres::Row;

/// Trait for converting a store row into a Rust value.
///
/// Generic over the row type so the same pipeline works with test executors that
/// return plain values. Defaults to `tokio_postgres::Row`.
///
/// # Example
///
/// ```ignore
/// use pgspec::{FromRow, RowExt, SpecResult};
///
/// struct User {
///     id: i64,
///     email: Option<String>,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &tokio_postgres::Row) -> SpecResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             email: row.try_get_column("email")?,
///         })
///     }
/// }
/// ```
pub trait FromRow<R = Row>: Sized {
    /// Convert a row into Self
    fn from_row(row: &R) -> SpecResult<Self>;
}

/// Rows that are already JSON map through serde.
impl<T: serde::de::DeserializeOwned> FromRow<serde_json::Value> for T {
    fn from_row(row: &serde_json::Value) -> SpecResult<Self> {
        serde_json::from_value(row.clone()).map_err(|e| SpecError::decode("<row>", e.to_string()))
    }
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning SpecError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> SpecResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> SpecResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| SpecError::decode(column, e.to_string()))
    }
}

/// Map every row, stopping at the first failure.
pub fn map_rows<R, T: FromRow<R>>(rows: &[R]) -> SpecResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}
