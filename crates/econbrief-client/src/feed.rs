//! Append-only "load more" list over a cursor feed.

use std::future::Future;

use crate::error::ClientError;
use crate::types::PageResponse;

/// Accumulated pages of one feed under a fixed filter set.
///
/// Pages are only ever appended. A failed or cancelled [`Feed::load_next`]
/// leaves the loaded pages and the cursor exactly as they were, so a caller
/// can simply retry. Call [`Feed::reset`] when the filters change.
#[derive(Debug, Clone)]
pub struct Feed<T> {
    pages: Vec<Vec<T>>,
    next_cursor: Option<String>,
    has_more: bool,
    total: Option<i64>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            next_cursor: None,
            has_more: true,
            total: None,
        }
    }
}

impl<T> Feed<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch and append the next page.
    ///
    /// `fetch` receives the cursor to resume from (`None` for the first
    /// page). Returns the number of items appended; `0` without calling
    /// `fetch` once the feed is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error. The feed is unchanged in that case.
    pub async fn load_next<F, Fut>(&mut self, fetch: F) -> Result<usize, ClientError>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = Result<PageResponse<T>, ClientError>>,
    {
        if !self.has_more {
            return Ok(0);
        }

        let page = fetch(self.next_cursor.clone()).await?;

        let appended = page.items.len();
        self.pages.push(page.items);
        self.next_cursor = page.next_cursor;
        self.has_more = page.has_more && self.next_cursor.is_some();
        if page.total.is_some() {
            self.total = page.total;
        }
        tracing::debug!(
            appended,
            pages = self.pages.len(),
            has_more = self.has_more,
            "feed page loaded"
        );
        Ok(appended)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// All loaded items in feed order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Total matching rows, if any loaded page reported one.
    #[must_use]
    pub fn total(&self) -> Option<i64> {
        self.total
    }
}
