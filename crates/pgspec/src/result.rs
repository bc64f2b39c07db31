//! Query result list returned through the middleware chain.

use crate::error::{SpecError, SpecResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Paging metadata attached by [`crate::middleware::Pagination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// 1-based page number that was fetched.
    pub current: i64,
    /// Rows per page.
    pub rows: i64,
    pub has_next: bool,
}

/// Items returned by a query plus whatever middleware attached to them.
///
/// Serializes as `{ "items": [...], "pagination": {...}, ...extensions }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultList<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
    /// Free-form attributes added by custom middleware.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl<T> QueryResultList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            pagination: None,
            extensions: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.pagination.is_some_and(|p| p.has_next)
    }

    /// Attach a serializable attribute under `key`.
    pub fn insert_extension(&mut self, key: impl Into<String>, value: impl Serialize) -> SpecResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| SpecError::validation(format!("extension is not serializable: {e}")))?;
        self.extensions.insert(key.into(), value);
        Ok(())
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// Transform the items, keeping pagination and extensions.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResultList<U> {
        QueryResultList {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
            extensions: self.extensions,
        }
    }

    /// Fallible [`QueryResultList::map`].
    pub fn try_map<U>(self, f: impl FnMut(T) -> SpecResult<U>) -> SpecResult<QueryResultList<U>> {
        Ok(QueryResultList {
            items: self.items.into_iter().map(f).collect::<SpecResult<_>>()?,
            pagination: self.pagination,
            extensions: self.extensions,
        })
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for QueryResultList<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> IntoIterator for QueryResultList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_flat_with_camel_case_page_info() {
        let mut list = QueryResultList::new(vec![1, 2]);
        list.pagination = Some(PageInfo {
            current: 1,
            rows: 2,
            has_next: false,
        });
        list.insert_extension("total", 2).unwrap();

        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({
                "items": [1, 2],
                "pagination": { "current": 1, "rows": 2, "hasNext": false },
                "total": 2
            })
        );
    }

    #[test]
    fn no_pagination_key_when_unset() {
        let list = QueryResultList::new(vec!["a"]);
        assert_eq!(serde_json::to_value(&list).unwrap(), json!({ "items": ["a"] }));
        assert!(!list.has_next());
    }

    #[test]
    fn map_keeps_metadata() {
        let mut list = QueryResultList::new(vec![1, 2, 3]);
        list.pagination = Some(PageInfo {
            current: 2,
            rows: 3,
            has_next: true,
        });
        let mapped = list.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert!(mapped.has_next());

        let err = mapped
            .try_map(|n| {
                if n > 10 {
                    Err(SpecError::validation("too big"))
                } else {
                    Ok(n)
                }
            })
            .unwrap_err();
        assert!(matches!(err, SpecError::Validation(_)));
    }
}
