//! Look-ahead pagination.
//!
//! `preprocess` asks the store for one row more than the page holds
//! (`take = rows + 1`, `skip = (page - 1) * rows`). `postprocess` uses that extra row to
//! decide whether a next page exists, drops it, and attaches a [`PageInfo`]. No COUNT
//! query is needed.
//!
//! Requests with `take == 1` or `no_pagination` set are left alone by both hooks.
//! `postprocess` only acts on criteria that `preprocess` actually resized.

use super::Middleware;
use crate::config::PaginationConfig;
use crate::criteria::QueryCriteria;
use crate::error::SpecResult;
use crate::result::{PageInfo, QueryResultList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    default_rows: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

impl Pagination {
    /// Paginate with `default_rows` rows per page when the criteria has no `rows`.
    /// Values below 1 are raised to 1.
    pub fn new(default_rows: i64) -> Self {
        Self {
            default_rows: default_rows.max(1),
        }
    }

    pub fn from_config(config: &PaginationConfig) -> Self {
        Self::new(config.default_rows)
    }

    pub fn default_rows(&self) -> i64 {
        self.default_rows
    }

    fn bypassed(criteria: &QueryCriteria) -> bool {
        criteria.no_pagination || criteria.take == Some(1)
    }

    /// Page and page size the criteria resolves to, both at least 1.
    fn window(&self, criteria: &QueryCriteria) -> (i64, i64) {
        let page = criteria.page.unwrap_or(1).max(1);
        let rows = criteria.rows.unwrap_or(self.default_rows).max(1);
        (page, rows)
    }
}

impl<T> Middleware<T> for Pagination {
    fn preprocess(&self, criteria: &mut QueryCriteria) -> SpecResult<()> {
        if Self::bypassed(criteria) {
            return Ok(());
        }
        let (page, rows) = self.window(criteria);
        criteria.page = Some(page);
        criteria.rows = Some(rows);
        criteria.take = Some(rows.saturating_add(1));
        criteria.skip = Some((page - 1).saturating_mul(rows));
        Ok(())
    }

    fn postprocess(&self, result: &mut QueryResultList<T>, criteria: &QueryCriteria) -> SpecResult<()> {
        if Self::bypassed(criteria) {
            return Ok(());
        }
        let (Some(page), Some(rows), Some(take)) = (criteria.page, criteria.rows, criteria.take) else {
            return Ok(());
        };
        if rows < 1 || take != rows.saturating_add(1) {
            return Ok(());
        }

        let take = usize::try_from(take).unwrap_or(usize::MAX);
        let has_next = result.items.len() >= take;
        if has_next {
            result.items.truncate(take - 1);
        }
        result.pagination = Some(PageInfo {
            current: page,
            rows,
            has_next,
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "pagination"
    }
}
