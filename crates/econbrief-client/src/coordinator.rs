//! Optimistic bookmark toggling over a [`QueryCache`].
//!
//! Per article the cache holds `["bookmarks", "status", <id>]` → `bool`. A
//! toggle flips that value before the server answers. On success the flip
//! stands and the aggregate views (`["bookmarks", "list", ..]` and
//! `["bookmarks", "batch", ..]`) are invalidated so they refetch. On failure
//! the call puts back the value it saw when it started; concurrent toggles
//! each carry their own snapshot.

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{QueryCache, QueryKey};
use crate::error::ClientError;

/// Server operations the coordinator depends on.
#[async_trait]
pub trait BookmarkApi: Send + Sync {
    /// Flip the bookmark and return the new server-side state.
    async fn toggle(&self, article_id: i64) -> Result<bool, ClientError>;

    async fn status(&self, article_id: i64) -> Result<bool, ClientError>;

    /// The bookmarked subset of `article_ids`.
    async fn batch_status(&self, article_ids: &[i64]) -> Result<Vec<i64>, ClientError>;
}

/// Client-observed bookmark state for one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkState {
    Unknown,
    Known(bool),
}

#[must_use]
pub fn status_key(article_id: i64) -> QueryKey {
    QueryKey::new(["bookmarks".to_string(), "status".to_string(), article_id.to_string()])
}

/// Key for a batch-status query; ids are expected sorted and deduplicated.
#[must_use]
pub fn batch_key(article_ids: &[i64]) -> QueryKey {
    let joined = article_ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    QueryKey::new(["bookmarks".to_string(), "batch".to_string(), joined])
}

#[must_use]
pub fn list_prefix() -> QueryKey {
    QueryKey::new(["bookmarks", "list"])
}

#[must_use]
pub fn batch_prefix() -> QueryKey {
    QueryKey::new(["bookmarks", "batch"])
}

pub struct BookmarkCoordinator<A> {
    api: A,
    cache: QueryCache,
}

impl<A: BookmarkApi> BookmarkCoordinator<A> {
    pub fn new(api: A, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub fn state(&self, article_id: i64) -> BookmarkState {
        match self.cache.get_as::<bool>(&status_key(article_id)) {
            Some(b) => BookmarkState::Known(b),
            None => BookmarkState::Unknown,
        }
    }

    /// Fetch one article's status and cache it.
    ///
    /// # Errors
    ///
    /// Propagates the [`BookmarkApi::status`] error; the cache is unchanged.
    pub async fn load(&self, article_id: i64) -> Result<bool, ClientError> {
        let bookmarked = self.api.status(article_id).await?;
        self.cache
            .set(status_key(article_id), Value::Bool(bookmarked));
        Ok(bookmarked)
    }

    /// Fetch the bookmarked subset of `article_ids`, caching both the batch
    /// answer and each article's individual status.
    ///
    /// # Errors
    ///
    /// Propagates the [`BookmarkApi::batch_status`] error; the cache is unchanged.
    pub async fn load_many(&self, article_ids: &[i64]) -> Result<Vec<i64>, ClientError> {
        let mut ids = article_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut bookmarked = self.api.batch_status(&ids).await?;
        bookmarked.sort_unstable();

        self.cache.set_as(batch_key(&ids), &bookmarked);
        for id in &ids {
            let is_bookmarked = bookmarked.binary_search(id).is_ok();
            self.cache.set(status_key(*id), Value::Bool(is_bookmarked));
        }
        Ok(bookmarked)
    }

    /// Optimistically flip `article_id`'s bookmark and confirm with the server.
    ///
    /// An `Unknown` state is loaded first. Returns the state reported by the
    /// server.
    ///
    /// # Errors
    ///
    /// Returns the load or toggle error. After a toggle failure the cached
    /// status is back to the value this call observed before flipping.
    pub async fn toggle(&self, article_id: i64) -> Result<bool, ClientError> {
        if self.state(article_id) == BookmarkState::Unknown {
            self.load(article_id).await?;
        }

        let key = status_key(article_id);
        let snapshot = self.cache.modify(&key, |current| {
            let was = current.and_then(Value::as_bool).unwrap_or(false);
            Some(Value::Bool(!was))
        });
        tracing::debug!(article_id, ?snapshot, "optimistic bookmark flip");

        match self.api.toggle(article_id).await {
            Ok(bookmarked) => {
                self.cache.invalidate_prefix(&list_prefix());
                self.cache.invalidate_prefix(&batch_prefix());
                Ok(bookmarked)
            }
            Err(e) => {
                tracing::warn!(article_id, error = %e, "bookmark toggle failed; rolling back");
                self.cache.restore(&key, snapshot);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
