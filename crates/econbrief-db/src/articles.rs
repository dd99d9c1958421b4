//! Article reads and the ingestion upsert.

use chrono::{DateTime, Utc};
use econbrief_core::articles::{AudienceImpact, RelatedContext};
use econbrief_core::{ArticleFilters, ArticleRecord, Cursor, Keyset, Page, SortKey};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

/// Column list for `ArticleRow`, qualified with the `a` alias.
macro_rules! article_columns {
    () => {
        "a.id, a.title, a.link, a.description, a.published_at, a.source, a.region, \
         a.category, a.headline_summary, a.so_what, a.impact_analysis, a.related_context, \
         a.sentiment, a.importance_score, a.keywords, a.created_at"
    };
}
pub(crate) use article_columns;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub headline_summary: Option<String>,
    pub so_what: Option<String>,
    pub impact_analysis: Option<Json<AudienceImpact>>,
    pub related_context: Option<Json<RelatedContext>>,
    pub sentiment: Option<String>,
    pub importance_score: Option<i16>,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Keyset for ArticleRow {
    fn sort_key(&self) -> SortKey {
        SortKey::new(self.published_at, self.id)
    }
}

/// One page of the article feed.
///
/// Ordered by `published_at DESC NULLS LAST, id DESC`. Undated articles sit
/// at the tail; a cursor admits only rows whose `(published_at, id)` key is
/// strictly below it, with a null `published_at` below every timestamp.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_articles_page(
    pool: &PgPool,
    filters: &ArticleFilters,
    cursor: Option<&Cursor>,
    limit: i64,
) -> Result<Page<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(concat!(
        "SELECT ",
        article_columns!(),
        " FROM articles a \
         WHERE ($1::TEXT IS NULL OR a.category = $1) \
           AND ($2::TEXT IS NULL OR a.region = $2) \
           AND ($3::TEXT IS NULL \
                OR a.title ILIKE $3 \
                OR a.description ILIKE $3 \
                OR a.headline_summary ILIKE $3) \
           AND ($5::BIGINT IS NULL \
                OR ($4::TIMESTAMPTZ IS NOT NULL \
                    AND (a.published_at IS NULL \
                         OR a.published_at < $4 \
                         OR (a.published_at = $4 AND a.id < $5))) \
                OR ($4::TIMESTAMPTZ IS NULL \
                    AND a.published_at IS NULL AND a.id < $5)) \
         ORDER BY a.published_at DESC NULLS LAST, a.id DESC \
         LIMIT $6"
    ))
    .bind(filters.category.map(|c| c.as_str()))
    .bind(filters.region.map(|r| r.as_str()))
    .bind(filters.like_pattern())
    .bind(cursor.and_then(|c| c.primary_key))
    .bind(cursor.map(|c| c.id))
    .bind(limit + 1)
    .fetch_all(pool)
    .await?;

    Ok(Page::from_overfetch(rows, limit))
}

/// Count all articles matching `filters`, ignoring any cursor.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_articles(pool: &PgPool, filters: &ArticleFilters) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM articles a \
         WHERE ($1::TEXT IS NULL OR a.category = $1) \
           AND ($2::TEXT IS NULL OR a.region = $2) \
           AND ($3::TEXT IS NULL \
                OR a.title ILIKE $3 \
                OR a.description ILIKE $3 \
                OR a.headline_summary ILIKE $3)",
    )
    .bind(filters.category.map(|c| c.as_str()))
    .bind(filters.region.map(|r| r.as_str()))
    .bind(filters.like_pattern())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Fetch one article, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_article(pool: &PgPool, id: i64) -> Result<Option<ArticleRow>, DbError> {
    let row = sqlx::query_as::<_, ArticleRow>(concat!(
        "SELECT ",
        article_columns!(),
        " FROM articles a WHERE a.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Resolve an embedded article-id list into articles, preserving list order.
///
/// Ids that no longer exist are skipped; repeated ids appear once, at their
/// first position.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn resolve_articles(pool: &PgPool, ids: &[i64]) -> Result<Vec<ArticleRow>, DbError> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    if unique.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, ArticleRow>(concat!(
        "SELECT ",
        article_columns!(),
        " FROM articles a \
         JOIN unnest($1::BIGINT[]) WITH ORDINALITY AS wanted(id, ord) ON wanted.id = a.id \
         ORDER BY wanted.ord"
    ))
    .bind(&unique)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert an article, or refresh the analysis fields of an existing one.
/// Dedup key: `link`. Returns the article id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_article(pool: &PgPool, article: &ArticleRecord) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO articles \
           (title, link, description, published_at, source, region, category, \
            headline_summary, so_what, impact_analysis, related_context, sentiment, \
            importance_score, keywords) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (link) DO UPDATE SET \
           title = EXCLUDED.title, \
           description = COALESCE(EXCLUDED.description, articles.description), \
           published_at = COALESCE(EXCLUDED.published_at, articles.published_at), \
           source = COALESCE(EXCLUDED.source, articles.source), \
           region = COALESCE(EXCLUDED.region, articles.region), \
           category = COALESCE(EXCLUDED.category, articles.category), \
           headline_summary = COALESCE(EXCLUDED.headline_summary, articles.headline_summary), \
           so_what = COALESCE(EXCLUDED.so_what, articles.so_what), \
           impact_analysis = COALESCE(EXCLUDED.impact_analysis, articles.impact_analysis), \
           related_context = COALESCE(EXCLUDED.related_context, articles.related_context), \
           sentiment = COALESCE(EXCLUDED.sentiment, articles.sentiment), \
           importance_score = COALESCE(EXCLUDED.importance_score, articles.importance_score), \
           keywords = EXCLUDED.keywords \
         RETURNING id",
    )
    .bind(&article.title)
    .bind(&article.link)
    .bind(&article.description)
    .bind(article.published_at)
    .bind(&article.source)
    .bind(article.region.map(|r| r.as_str()))
    .bind(article.category.map(|c| c.as_str()))
    .bind(&article.headline_summary)
    .bind(&article.so_what)
    .bind(article.impact_analysis.as_ref().map(Json))
    .bind(article.related_context.as_ref().map(Json))
    .bind(article.sentiment.map(|s| s.as_str()))
    .bind(article.importance_score)
    .bind(&article.keywords)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
