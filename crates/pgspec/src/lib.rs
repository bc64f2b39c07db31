//! # pgspec
//!
//! Declarative query specifications for PostgreSQL.
//!
//! A query is declared once as a [`QuerySpec`]: a `source` function that seeds a
//! [`QueryBuilder`] with tables, joins and columns, plus named filter rules. At runtime a
//! [`QueryCriteria`] (filters, sort, paging) is compiled into parameterized SQL, executed
//! through a [`QueryDriver`], and post-processed by a [`QueryRunner`] middleware chain such
//! as look-ahead [`Pagination`].
//!
//! ## Features
//!
//! - **Parameterized by construction**: every value becomes a `$n` placeholder; only
//!   [`unescape`] fragments are spliced as text
//! - **Identifier checks**: tables, aliases, columns and sort fields are validated
//! - **Explicit ownership**: each execution builds from a fresh builder; specs and drivers are
//!   shareable across tasks
//! - **Narrow store capability**: anything implementing [`SqlExecutor`]
//!
//! ```ignore
//! use pgspec::{Condition, Pagination, QueryCriteria, QueryDriver, QueryRunner, QuerySpec, define_query};
//!
//! let spec = QuerySpec::builder("users")
//!     .source(|qb| {
//!         qb.from("users", "u").columns(["u.id", "u.email"]);
//!     })
//!     .rule("status", |qb, value| {
//!         qb.where_(Condition::eq("u.status", value.clone()));
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let users = define_query(QueryDriver::new(client), spec);
//! let runner = QueryRunner::new().with(Pagination::new(20));
//!
//! let page: QueryResultList<User> = users
//!     .fetch(&runner, QueryCriteria::new().filter("status", "active").page(2))
//!     .await?;
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod criteria;
pub mod driver;
pub mod error;
pub mod field;
pub mod ident;
pub mod middleware;
pub mod param;
pub mod result;
pub mod row;
pub mod spec;
pub mod sql;

pub use builder::{CompiledQuery, JoinKind, QueryBuilder, create_builder};
pub use condition::{CaseWhen, CompareOp, Condition, Expr, Raw, and, case_when, coalesce, or, unescape};
pub use config::{DriverConfig, PaginationConfig, PipelineConfig, SqlLogLevel};
pub use criteria::{FilterValue, QueryCriteria, SortDir, SortField};
pub use driver::{QueryDriver, SqlExecutor};
pub use error::{SpecError, SpecResult};
pub use field::Field;
pub use middleware::{Middleware, Pagination, QueryRunner, postprocess_fn, preprocess_fn};
pub use param::{Param, ParamList};
pub use result::{PageInfo, QueryResultList};
pub use row::{FromRow, RowExt};
pub use spec::{DefinedQuery, QuerySpec, QuerySpecBuilder, UnknownFilterPolicy, define_query};
pub use sql::SqlWriter;
