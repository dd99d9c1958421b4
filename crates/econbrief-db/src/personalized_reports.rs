//! Database operations for the `personalized_reports` table.
//! Same feed shape as daily reports, scoped to one owner.

use chrono::{DateTime, NaiveDate, Utc};
use econbrief_core::reports::{ExecutiveSummary, KeyInsight, MarketOverview, SentimentCounts};
use econbrief_core::{Cursor, Keyset, Page, PersonalizedReportRecord, PreferenceSnapshot, SortKey};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersonalizedReportRow {
    pub id: i64,
    pub user_id: i64,
    pub report_date: NaiveDate,
    pub executive_summary: Json<ExecutiveSummary>,
    pub market_overview: Json<MarketOverview>,
    pub key_insights: Json<Vec<KeyInsight>>,
    pub sentiment_counts: Json<SentimentCounts>,
    pub top_keywords: Vec<String>,
    pub article_ids: Vec<i64>,
    pub article_count: i32,
    pub preference_snapshot: Json<PreferenceSnapshot>,
    pub created_at: DateTime<Utc>,
}

impl Keyset for PersonalizedReportRow {
    fn sort_key(&self) -> SortKey {
        SortKey::from_date(self.report_date, self.id)
    }
}

/// One page of a user's personalized reports, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_personalized_reports_page(
    pool: &PgPool,
    user_id: i64,
    cursor: Option<&Cursor>,
    limit: i64,
) -> Result<Page<PersonalizedReportRow>, DbError> {
    let rows = sqlx::query_as::<_, PersonalizedReportRow>(
        "SELECT id, user_id, report_date, executive_summary, market_overview, key_insights, \
                sentiment_counts, top_keywords, article_ids, article_count, \
                preference_snapshot, created_at \
         FROM personalized_reports \
         WHERE user_id = $1 \
           AND ($3::BIGINT IS NULL \
                OR ($2::TIMESTAMPTZ IS NOT NULL \
                    AND ((report_date::TIMESTAMP AT TIME ZONE 'UTC', id) < ($2, $3)))) \
         ORDER BY report_date DESC, id DESC \
         LIMIT $4",
    )
    .bind(user_id)
    .bind(cursor.and_then(|c| c.primary_key))
    .bind(cursor.map(|c| c.id))
    .bind(limit + 1)
    .fetch_all(pool)
    .await?;

    Ok(Page::from_overfetch(rows, limit))
}

/// Return `user_id`'s report for `date`, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_personalized_report_by_date(
    pool: &PgPool,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<PersonalizedReportRow>, DbError> {
    let row = sqlx::query_as::<_, PersonalizedReportRow>(
        "SELECT id, user_id, report_date, executive_summary, market_overview, key_insights, \
                sentiment_counts, top_keywords, article_ids, article_count, \
                preference_snapshot, created_at \
         FROM personalized_reports \
         WHERE user_id = $1 AND report_date = $2",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert or replace `user_id`'s report for the record's date.
/// Dedup key: (`user_id`, `report_date`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_personalized_report(
    pool: &PgPool,
    user_id: i64,
    record: &PersonalizedReportRecord,
) -> Result<i64, DbError> {
    let report = &record.report;
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO personalized_reports \
           (user_id, report_date, executive_summary, market_overview, key_insights, \
            sentiment_counts, top_keywords, article_ids, article_count, preference_snapshot) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (user_id, report_date) DO UPDATE SET \
           executive_summary = EXCLUDED.executive_summary, \
           market_overview = EXCLUDED.market_overview, \
           key_insights = EXCLUDED.key_insights, \
           sentiment_counts = EXCLUDED.sentiment_counts, \
           top_keywords = EXCLUDED.top_keywords, \
           article_ids = EXCLUDED.article_ids, \
           article_count = EXCLUDED.article_count, \
           preference_snapshot = EXCLUDED.preference_snapshot \
         RETURNING id",
    )
    .bind(user_id)
    .bind(report.report_date)
    .bind(Json(&report.executive_summary))
    .bind(Json(&report.market_overview))
    .bind(Json(&report.key_insights))
    .bind(Json(&report.sentiment_counts))
    .bind(&report.top_keywords)
    .bind(&report.article_ids)
    .bind(report.article_count())
    .bind(Json(&record.preference_snapshot))
    .fetch_one(pool)
    .await?;
    Ok(id)
}
