//! Middleware chain around query execution.
//!
//! A [`Middleware`] is a pair of optional hooks. [`QueryRunner`] applies every
//! `preprocess` hook in registration order, executes the query with the rewritten
//! criteria, then applies every `postprocess` hook in the same order, so a later
//! middleware observes what earlier ones did to the result.
//!
//! ```ignore
//! use pgspec::middleware::{Pagination, QueryRunner, postprocess_fn};
//!
//! let runner = QueryRunner::new()
//!     .with(Pagination::new(25))
//!     .with(postprocess_fn(|result: &mut QueryResultList<User>, _criteria: &QueryCriteria| {
//!         result.insert_extension("served_by", "replica-1")
//!     }));
//! ```

mod pagination;

pub use pagination::Pagination;

use crate::criteria::QueryCriteria;
use crate::error::SpecResult;
use crate::result::QueryResultList;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Hooks run around one query execution. Both default to no-ops.
///
/// Any error aborts the run; no partial result is returned.
pub trait Middleware<T>: Send + Sync {
    /// Rewrite the criteria before execution.
    fn preprocess(&self, criteria: &mut QueryCriteria) -> SpecResult<()> {
        let _ = criteria;
        Ok(())
    }

    /// Rewrite the result after execution. `criteria` is the preprocessed criteria the
    /// query ran with.
    fn postprocess(&self, result: &mut QueryResultList<T>, criteria: &QueryCriteria) -> SpecResult<()> {
        let _ = (result, criteria);
        Ok(())
    }

    /// Name used in trace events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Ordered middleware chain.
pub struct QueryRunner<T> {
    middlewares: Vec<Arc<dyn Middleware<T>>>,
}

impl<T> Default for QueryRunner<T> {
    fn default() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }
}

impl<T> Clone for QueryRunner<T> {
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.middlewares.iter().map(|m| m.name()))
            .finish()
    }
}

impl<T> QueryRunner<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the end of the chain.
    pub fn with<M: Middleware<T> + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append a shared middleware to the end of the chain.
    pub fn push(&mut self, middleware: Arc<dyn Middleware<T>>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run `exec` inside the chain.
    ///
    /// `criteria` is rewritten in place by the preprocess hooks; `exec` receives a copy of
    /// the rewritten criteria and returns the items the result list is built from.
    pub async fn run_with<F, Fut>(&self, criteria: &mut QueryCriteria, exec: F) -> SpecResult<QueryResultList<T>>
    where
        F: FnOnce(QueryCriteria) -> Fut,
        Fut: Future<Output = SpecResult<Vec<T>>>,
    {
        for middleware in &self.middlewares {
            tracing::trace!(target: "pgspec.runner", middleware = middleware.name(), "preprocess");
            middleware.preprocess(criteria)?;
        }

        let items = exec(criteria.clone()).await?;
        let mut result = QueryResultList::new(items);

        for middleware in &self.middlewares {
            tracing::trace!(target: "pgspec.runner", middleware = middleware.name(), "postprocess");
            middleware.postprocess(&mut result, criteria)?;
        }
        Ok(result)
    }
}

/// Middleware with only a preprocess hook, built by [`preprocess_fn`].
pub struct PreprocessFn<F> {
    f: F,
}

/// Wrap a closure as a preprocess-only middleware.
pub fn preprocess_fn<F>(f: F) -> PreprocessFn<F>
where
    F: Fn(&mut QueryCriteria) -> SpecResult<()> + Send + Sync,
{
    PreprocessFn { f }
}

impl<T, F> Middleware<T> for PreprocessFn<F>
where
    F: Fn(&mut QueryCriteria) -> SpecResult<()> + Send + Sync,
{
    fn preprocess(&self, criteria: &mut QueryCriteria) -> SpecResult<()> {
        (self.f)(criteria)
    }

    fn name(&self) -> &str {
        "preprocess_fn"
    }
}

/// Middleware with only a postprocess hook, built by [`postprocess_fn`].
pub struct PostprocessFn<T, F> {
    f: F,
    _marker: PhantomData<fn(&mut QueryResultList<T>)>,
}

/// Wrap a closure as a postprocess-only middleware.
pub fn postprocess_fn<T, F>(f: F) -> PostprocessFn<T, F>
where
    F: Fn(&mut QueryResultList<T>, &QueryCriteria) -> SpecResult<()> + Send + Sync,
{
    PostprocessFn {
        f,
        _marker: PhantomData,
    }
}

impl<T, F> Middleware<T> for PostprocessFn<T, F>
where
    F: Fn(&mut QueryResultList<T>, &QueryCriteria) -> SpecResult<()> + Send + Sync,
{
    fn postprocess(&self, result: &mut QueryResultList<T>, criteria: &QueryCriteria) -> SpecResult<()> {
        (self.f)(result, criteria)
    }

    fn name(&self) -> &str {
        "postprocess_fn"
    }
}

#[cfg(test)]
mod tests;
