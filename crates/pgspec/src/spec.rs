//! Query specifications: a named source plus a table of filter rules.
//!
//! A [`QuerySpec`] is declared once and shared by every execution. Each execution gets a
//! fresh builder, seeded by the query's source function, then extended by the rules whose
//! names appear in the criteria's filters.
//!
//! ```ignore
//! use pgspec::{Condition, QuerySpec, define_query, QueryDriver};
//!
//! let spec = QuerySpec::builder("active_users")
//!     .source(|qb| {
//!         qb.from("users", "u")
//!             .left_join("profiles", "p", Condition::eq_field("p.user_id", "u.id"))
//!             .columns(["u.id", "u.email", "p.display_name"]);
//!     })
//!     .rule("status", |qb, value| {
//!         qb.where_(Condition::eq("u.status", value.clone()));
//!         Ok(())
//!     })
//!     .rule("min_age", |qb, value| {
//!         let age = value.as_i64().ok_or_else(|| SpecError::validation("min_age must be a number"))?;
//!         qb.where_(Condition::gte("u.age", age));
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let users = define_query(QueryDriver::new(client), spec);
//! let rows = users.execute(&criteria).await?;
//! ```

use crate::builder::{CompiledQuery, QueryBuilder, create_builder};
use crate::criteria::{FilterValue, QueryCriteria};
use crate::driver::{QueryDriver, SqlExecutor};
use crate::error::{SpecError, SpecResult};
use crate::middleware::QueryRunner;
use crate::result::QueryResultList;
use crate::row::FromRow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Seeds a fresh builder with sources, joins and columns.
pub type SourceFn = Arc<dyn Fn(&mut QueryBuilder) + Send + Sync>;

/// Adds the conditions for one filter value.
pub type RuleFn = Arc<dyn Fn(&mut QueryBuilder, &FilterValue) -> SpecResult<()> + Send + Sync>;

/// What to do with filter keys that have no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFilterPolicy {
    /// Skip them, so callers may pass a superset of the known filters.
    #[default]
    Ignore,
    /// Fail with [`SpecError::Config`] before any builder work.
    Reject,
}

/// A named source plus its rule table. Immutable once built.
#[derive(Clone)]
pub struct QuerySpec {
    name: String,
    source: SourceFn,
    rules: HashMap<String, RuleFn>,
    unknown_filters: UnknownFilterPolicy,
}

impl fmt::Debug for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("name", &self.name)
            .field("rules", &self.rule_names())
            .field("unknown_filters", &self.unknown_filters)
            .finish()
    }
}

impl QuerySpec {
    pub fn builder(name: impl Into<String>) -> QuerySpecBuilder {
        QuerySpecBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unknown_filters(&self) -> UnknownFilterPolicy {
        self.unknown_filters
    }

    /// Rule names in sorted order.
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Check the criteria's filter keys against the rule table.
    ///
    /// Always passes under [`UnknownFilterPolicy::Ignore`].
    pub fn check_criteria(&self, criteria: &QueryCriteria) -> SpecResult<()> {
        if self.unknown_filters == UnknownFilterPolicy::Ignore {
            return Ok(());
        }
        let unknown: Vec<&str> = criteria
            .filters
            .keys()
            .map(String::as_str)
            .filter(|key| !self.has_rule(key))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(SpecError::config(format!(
                "query '{}' has no rule for filter(s): {}",
                self.name,
                unknown.join(", ")
            )))
        }
    }

    /// Apply one rule by name. Applying a rule again adds its conditions again.
    pub fn apply_rule(&self, builder: &mut QueryBuilder, rule: &str, value: &FilterValue) -> SpecResult<()> {
        let Some(apply) = self.rules.get(rule) else {
            return Err(SpecError::config(format!(
                "query '{}' has no rule named '{rule}'",
                self.name
            )));
        };
        apply(builder, value)
    }

    /// Build the statement for `criteria`: a fresh builder seeded by the source, plus one
    /// rule application per non-empty filter, in key order.
    pub fn prepare(&self, criteria: &QueryCriteria) -> SpecResult<QueryBuilder> {
        self.check_criteria(criteria)?;

        let mut builder = create_builder();
        (self.source)(&mut builder);

        for (key, value) in criteria.active_filters() {
            match self.rules.get(key) {
                Some(apply) => apply(&mut builder, value)?,
                None => tracing::debug!(
                    target: "pgspec.query",
                    query = %self.name,
                    filter = key,
                    "ignoring filter without a rule"
                ),
            }
        }
        Ok(builder)
    }

    /// Prepare and compile without executing.
    pub fn compile(&self, criteria: &QueryCriteria) -> SpecResult<CompiledQuery> {
        self.prepare(criteria)?.compile(criteria)
    }
}

/// Builder for [`QuerySpec`].
pub struct QuerySpecBuilder {
    name: String,
    source: Option<SourceFn>,
    rules: Vec<(String, RuleFn)>,
    unknown_filters: UnknownFilterPolicy,
}

impl QuerySpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            rules: Vec::new(),
            unknown_filters: UnknownFilterPolicy::default(),
        }
    }

    /// Set the source function. A later call replaces an earlier one.
    pub fn source<F>(mut self, source: F) -> Self
    where
        F: Fn(&mut QueryBuilder) + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Register a filter rule.
    pub fn rule<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&mut QueryBuilder, &FilterValue) -> SpecResult<()> + Send + Sync + 'static,
    {
        self.rules.push((name.into(), Arc::new(rule)));
        self
    }

    pub fn unknown_filters(mut self, policy: UnknownFilterPolicy) -> Self {
        self.unknown_filters = policy;
        self
    }

    /// Shorthand for [`UnknownFilterPolicy::Reject`].
    pub fn reject_unknown_filters(self) -> Self {
        self.unknown_filters(UnknownFilterPolicy::Reject)
    }

    /// Resolve the rule table.
    ///
    /// Fails with [`SpecError::Config`] when there is no source, a rule name is empty,
    /// or two rules share a name.
    pub fn build(self) -> SpecResult<QuerySpec> {
        let Some(source) = self.source else {
            return Err(SpecError::config(format!(
                "query '{}' has no source",
                self.name
            )));
        };

        let mut rules = HashMap::with_capacity(self.rules.len());
        for (rule_name, rule) in self.rules {
            if rule_name.is_empty() {
                return Err(SpecError::config(format!(
                    "query '{}' has a rule with an empty name",
                    self.name
                )));
            }
            if rules.contains_key(&rule_name) {
                return Err(SpecError::config(format!(
                    "query '{}' defines rule '{rule_name}' more than once",
                    self.name
                )));
            }
            rules.insert(rule_name, rule);
        }

        Ok(QuerySpec {
            name: self.name,
            source,
            rules,
            unknown_filters: self.unknown_filters,
        })
    }
}

/// Bind a driver to a specification.
pub fn define_query<E: SqlExecutor>(driver: QueryDriver<E>, spec: QuerySpec) -> DefinedQuery<E> {
    DefinedQuery {
        driver: Arc::new(driver),
        spec: Arc::new(spec),
    }
}

/// A specification bound to a driver. Cheap to clone and safe to share.
pub struct DefinedQuery<E> {
    driver: Arc<QueryDriver<E>>,
    spec: Arc<QuerySpec>,
}

impl<E> Clone for DefinedQuery<E> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            spec: Arc::clone(&self.spec),
        }
    }
}

impl<E> fmt::Debug for DefinedQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinedQuery")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl<E: SqlExecutor> DefinedQuery<E> {
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn driver(&self) -> &QueryDriver<E> {
        &self.driver
    }

    /// Compile `criteria` without executing.
    pub fn compile(&self, criteria: &QueryCriteria) -> SpecResult<CompiledQuery> {
        self.spec.compile(criteria)
    }

    /// Execute once, without middleware, returning raw rows.
    pub async fn execute(&self, criteria: &QueryCriteria) -> SpecResult<Vec<E::Row>> {
        let builder = self.spec.prepare(criteria)?;
        self.driver.execute(self.spec.name(), builder, criteria).await
    }

    /// Execute through `runner`, returning raw rows.
    pub async fn run(
        &self,
        runner: &QueryRunner<E::Row>,
        mut criteria: QueryCriteria,
    ) -> SpecResult<QueryResultList<E::Row>> {
        runner
            .run_with(&mut criteria, |criteria| async move { self.execute(&criteria).await })
            .await
    }

    /// Execute through `runner`, mapping each row with [`FromRow`] before postprocessing.
    pub async fn fetch<T>(&self, runner: &QueryRunner<T>, mut criteria: QueryCriteria) -> SpecResult<QueryResultList<T>>
    where
        T: FromRow<E::Row>,
    {
        runner
            .run_with(&mut criteria, |criteria| async move {
                let rows = self.execute(&criteria).await?;
                rows.iter().map(T::from_row).collect()
            })
            .await
    }
}
