//! Keyset pagination model shared by every feed.
//!
//! Feeds are ordered by [`SortKey`] descending: newest primary timestamp first,
//! higher id first on ties. Rows without a primary timestamp compare below every
//! timestamped row, so they collect at the tail of the feed and are ordered by id
//! among themselves. A [`Cursor`] marks the last row of a page; the next page
//! holds exactly the rows whose key is strictly below it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Hard upper bound on page size for every feed.
pub const MAX_PAGE_LIMIT: i64 = 50;

/// Two-key ordering used by all feeds.
///
/// The derived `Ord` is lexicographic over `(primary, id)` with `None` below any
/// `Some`, which makes the order total as long as ids are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub primary: Option<DateTime<Utc>>,
    pub id: i64,
}

impl SortKey {
    #[must_use]
    pub fn new(primary: Option<DateTime<Utc>>, id: i64) -> Self {
        Self { primary, id }
    }

    /// Sort key for date-keyed rows (daily and personalized reports).
    #[must_use]
    pub fn from_date(date: NaiveDate, id: i64) -> Self {
        Self::new(Some(date_to_timestamp(date)), id)
    }

    /// Whether a row with this key belongs after `cursor` in feed order.
    #[must_use]
    pub fn is_after(&self, cursor: &Cursor) -> bool {
        *self < cursor.sort_key()
    }
}

/// Anything that can be placed in a keyset feed.
pub trait Keyset {
    fn sort_key(&self) -> SortKey;
}

/// Page boundary token.
///
/// The wire form is the compact JSON object
/// `{"primary_key": <RFC 3339 timestamp | null>, "id": <int>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cursor {
    pub primary_key: Option<DateTime<Utc>>,
    pub id: i64,
}

impl Cursor {
    #[must_use]
    pub fn new(primary_key: Option<DateTime<Utc>>, id: i64) -> Self {
        Self { primary_key, id }
    }

    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.primary_key, self.id)
    }

    /// Serialize to the opaque token handed to clients.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::json!({
            "primary_key": self.primary_key,
            "id": self.id,
        })
        .to_string()
    }

    /// Parse a token previously produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCursor`] when the token is not a JSON
    /// object of the expected shape or the id is not positive. A malformed
    /// token is never treated as "first page".
    pub fn decode(raw: &str) -> Result<Self, ValidationError> {
        let cursor: Cursor = serde_json::from_str(raw.trim())
            .map_err(|e| ValidationError::InvalidCursor(e.to_string()))?;
        if cursor.id < 1 {
            return Err(ValidationError::InvalidCursor(format!(
                "id must be positive, got {}",
                cursor.id
            )));
        }
        Ok(cursor)
    }
}

impl From<SortKey> for Cursor {
    fn from(key: SortKey) -> Self {
        Self::new(key.primary, key.id)
    }
}

/// One page of a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
}

impl<T> Page<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    /// Convert the items while keeping the page boundary.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

impl<T: Keyset> Page<T> {
    /// Build a page from up to `limit + 1` rows already in feed order.
    ///
    /// The extra row only signals that more data exists; it is dropped before
    /// the cursor is taken from the new last item.
    #[must_use]
    pub fn from_overfetch(mut rows: Vec<T>, limit: i64) -> Self {
        let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let next_cursor = if has_more {
            rows.last().map(|row| Cursor::from(row.sort_key()))
        } else {
            None
        };

        Self {
            items: rows,
            next_cursor,
            has_more,
        }
    }
}

/// Resolve a requested page size against a feed default and [`MAX_PAGE_LIMIT`].
///
/// # Errors
///
/// Returns [`ValidationError::InvalidLimit`] for values below 1.
pub fn resolve_limit(requested: Option<i64>, default: i64) -> Result<i64, ValidationError> {
    match requested {
        None => Ok(default.clamp(1, MAX_PAGE_LIMIT)),
        Some(n) if n < 1 => Err(ValidationError::InvalidLimit(n)),
        Some(n) => Ok(n.min(MAX_PAGE_LIMIT)),
    }
}

/// Midnight UTC of `date`.
#[must_use]
pub fn date_to_timestamp(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
#[path = "pagination_test.rs"]
mod tests;
