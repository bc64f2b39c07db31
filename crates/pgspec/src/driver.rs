//! Query driver: compiles a seeded builder and runs it on a raw-SQL executor.

use crate::builder::{CompiledQuery, QueryBuilder};
use crate::config::DriverConfig;
use crate::criteria::QueryCriteria;
use crate::error::{SpecError, SpecResult};
use std::future::Future;
use std::sync::Arc;
use tokio_postgres::types::ToSql;
use tracing::Level;

/// The narrow store capability the pipeline needs: run SQL text with positional
/// parameters and hand back rows.
///
/// Implemented for `tokio_postgres::Client` and `tokio_postgres::Transaction`, and for
/// references and `Arc`s of any executor. Test doubles can pick their own `Row` type.
pub trait SqlExecutor: Send + Sync {
    type Row: Send;

    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = SpecResult<Vec<Self::Row>>> + Send;
}

impl SqlExecutor for tokio_postgres::Client {
    type Row = tokio_postgres::Row;

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> SpecResult<Vec<tokio_postgres::Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }
}

impl SqlExecutor for tokio_postgres::Transaction<'_> {
    type Row = tokio_postgres::Row;

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> SpecResult<Vec<tokio_postgres::Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }
}

impl<C: SqlExecutor> SqlExecutor for &C {
    type Row = C::Row;

    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = SpecResult<Vec<Self::Row>>> + Send {
        (**self).query(sql, params)
    }
}

impl<C: SqlExecutor> SqlExecutor for Arc<C> {
    type Row = C::Row;

    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = SpecResult<Vec<Self::Row>>> + Send {
        (**self).query(sql, params)
    }
}

/// Compiles builders and executes them.
///
/// The driver holds no per-call state: the seeded builder and the criteria are passed to
/// every [`QueryDriver::execute`] call, so one driver can serve any number of queries
/// concurrently as long as its executor can.
#[derive(Debug, Clone)]
pub struct QueryDriver<E> {
    executor: E,
    config: DriverConfig,
}

impl<E: SqlExecutor> QueryDriver<E> {
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, DriverConfig::default())
    }

    pub fn with_config(executor: E, config: DriverConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Compile `builder` with `criteria` and run it. Rows are returned unmodified.
    ///
    /// `query` names the query in log events. A builder without a FROM source is a
    /// [`SpecError::Config`] and nothing is compiled or sent.
    pub async fn execute(
        &self,
        query: &str,
        builder: QueryBuilder,
        criteria: &QueryCriteria,
    ) -> SpecResult<Vec<E::Row>> {
        if !builder.has_source() {
            return Err(SpecError::config(format!(
                "query '{query}' has no source attached"
            )));
        }
        let compiled = builder.compile(criteria)?;
        self.execute_compiled(query, &compiled).await
    }

    /// Run an already compiled statement.
    pub async fn execute_compiled(
        &self,
        query: &str,
        compiled: &CompiledQuery,
    ) -> SpecResult<Vec<E::Row>> {
        self.log_sql(query, compiled);
        let params = compiled.params_ref();
        match self.executor.query(&compiled.sql, &params).await {
            Ok(rows) => Ok(rows),
            Err(err) => {
                tracing::error!(target: "pgspec.query", query, error = %err, "query failed");
                Err(err)
            }
        }
    }

    fn log_sql(&self, query: &str, compiled: &CompiledQuery) {
        if !self.config.log_sql {
            return;
        }

        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::TRACE => tracing::trace!($($field)*),
                    _ => tracing::debug!($($field)*),
                }
            };
        }

        let level = self.config.sql_log_level.as_level();
        let sql = truncate_sql(&compiled.sql, self.config.max_sql_length);
        let param_count = compiled.params.len();
        if self.config.log_params {
            emit_at_level!(
                level,
                target: "pgspec.sql",
                query,
                param_count,
                sql = %sql,
                params = ?compiled.params,
            );
        } else {
            emit_at_level!(
                level,
                target: "pgspec.sql",
                query,
                param_count,
                sql = %sql,
            );
        }
    }
}

/// Cut `sql` to at most `max` bytes on a char boundary. `0` means no limit.
pub(crate) fn truncate_sql(sql: &str, max: usize) -> String {
    if max == 0 || sql.len() <= max {
        return sql.to_string();
    }
    let mut end = max;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}
