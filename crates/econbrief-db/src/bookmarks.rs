//! Bookmarks: a row for (user, article) means "bookmarked".

use chrono::{DateTime, Utc};
use econbrief_core::{Cursor, Keyset, Page, SortKey};
use sqlx::PgPool;

use crate::articles::{article_columns, ArticleRow};
use crate::{DbError, FOREIGN_KEY_VIOLATION};

/// A bookmarked article together with when it was bookmarked.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookmarkedArticleRow {
    pub bookmark_id: i64,
    pub bookmarked_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub article: ArticleRow,
}

impl Keyset for BookmarkedArticleRow {
    fn sort_key(&self) -> SortKey {
        SortKey::new(Some(self.bookmarked_at), self.bookmark_id)
    }
}

/// Flip the bookmark for (`user_id`, `article_id`) and return the new state.
///
/// Deletes the row if present (`false`), otherwise inserts it (`true`). Not
/// replay-safe: two calls flip twice. The unique (user, article) constraint
/// keeps concurrent inserts from producing duplicates.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the article does not exist, or
/// [`DbError::Sqlx`] on any other failure.
pub async fn toggle_bookmark(pool: &PgPool, user_id: i64, article_id: i64) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND article_id = $2")
        .bind(user_id)
        .bind(article_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed > 0 {
        tx.commit().await?;
        tracing::debug!(user_id, article_id, "bookmark removed");
        return Ok(false);
    }

    let inserted = sqlx::query(
        "INSERT INTO bookmarks (user_id, article_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, article_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(article_id)
    .execute(&mut *tx)
    .await
    .map_err(DbError::from);

    if let Err(e) = inserted {
        if e.has_sqlstate(FOREIGN_KEY_VIOLATION) {
            return Err(DbError::NotFound);
        }
        return Err(e);
    }

    tx.commit().await?;
    tracing::debug!(user_id, article_id, "bookmark added");
    Ok(true)
}

/// Whether `user_id` has bookmarked `article_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_bookmarked(pool: &PgPool, user_id: i64, article_id: i64) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM bookmarks WHERE user_id = $1 AND article_id = $2)",
    )
    .bind(user_id)
    .bind(article_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// The subset of `article_ids` that `user_id` has bookmarked, ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn bookmarked_article_ids(
    pool: &PgPool,
    user_id: i64,
    article_ids: &[i64],
) -> Result<Vec<i64>, DbError> {
    if article_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT article_id FROM bookmarks \
         WHERE user_id = $1 AND article_id = ANY($2) \
         ORDER BY article_id",
    )
    .bind(user_id)
    .bind(article_ids)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// One page of `user_id`'s bookmarked articles, most recently bookmarked first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_bookmarked_articles_page(
    pool: &PgPool,
    user_id: i64,
    cursor: Option<&Cursor>,
    limit: i64,
) -> Result<Page<BookmarkedArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, BookmarkedArticleRow>(concat!(
        "SELECT b.id AS bookmark_id, b.created_at AS bookmarked_at, ",
        article_columns!(),
        " FROM bookmarks b \
         JOIN articles a ON a.id = b.article_id \
         WHERE b.user_id = $1 \
           AND ($3::BIGINT IS NULL \
                OR ($2::TIMESTAMPTZ IS NOT NULL \
                    AND (b.created_at < $2 OR (b.created_at = $2 AND b.id < $3)))) \
         ORDER BY b.created_at DESC, b.id DESC \
         LIMIT $4"
    ))
    .bind(user_id)
    .bind(cursor.and_then(|c| c.primary_key))
    .bind(cursor.map(|c| c.id))
    .bind(limit + 1)
    .fetch_all(pool)
    .await?;

    Ok(Page::from_overfetch(rows, limit))
}
