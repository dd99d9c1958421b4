//! Database operations for the `daily_reports` table.

use chrono::{DateTime, NaiveDate, Utc};
use econbrief_core::reports::{ExecutiveSummary, KeyInsight, MarketOverview, SentimentCounts};
use econbrief_core::{Cursor, DailyReportRecord, Keyset, Page, SortKey};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyReportRow {
    pub id: i64,
    pub report_date: NaiveDate,
    pub executive_summary: Json<ExecutiveSummary>,
    pub market_overview: Json<MarketOverview>,
    pub key_insights: Json<Vec<KeyInsight>>,
    pub sentiment_counts: Json<SentimentCounts>,
    pub top_keywords: Vec<String>,
    pub article_ids: Vec<i64>,
    pub article_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Keyset for DailyReportRow {
    fn sort_key(&self) -> SortKey {
        SortKey::from_date(self.report_date, self.id)
    }
}

/// One page of daily reports, newest `report_date` first, `id DESC` on ties.
///
/// Report dates compare as midnight UTC, the same key rows hand out as
/// cursors. A cursor with a null primary key admits nothing here since every
/// report has a date.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_daily_reports_page(
    pool: &PgPool,
    cursor: Option<&Cursor>,
    limit: i64,
) -> Result<Page<DailyReportRow>, DbError> {
    let rows = sqlx::query_as::<_, DailyReportRow>(
        "SELECT id, report_date, executive_summary, market_overview, key_insights, \
                sentiment_counts, top_keywords, article_ids, article_count, created_at \
         FROM daily_reports \
         WHERE ($2::BIGINT IS NULL \
                OR ($1::TIMESTAMPTZ IS NOT NULL \
                    AND ((report_date::TIMESTAMP AT TIME ZONE 'UTC', id) < ($1, $2)))) \
         ORDER BY report_date DESC, id DESC \
         LIMIT $3",
    )
    .bind(cursor.and_then(|c| c.primary_key))
    .bind(cursor.map(|c| c.id))
    .bind(limit + 1)
    .fetch_all(pool)
    .await?;

    Ok(Page::from_overfetch(rows, limit))
}

/// Return the report for `date`, or `None` if none was generated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_daily_report_by_date(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Option<DailyReportRow>, DbError> {
    let row = sqlx::query_as::<_, DailyReportRow>(
        "SELECT id, report_date, executive_summary, market_overview, key_insights, \
                sentiment_counts, top_keywords, article_ids, article_count, created_at \
         FROM daily_reports WHERE report_date = $1",
    )
    .bind(date)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Return the most recent daily report, or `None` if there are none yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_daily_report(pool: &PgPool) -> Result<Option<DailyReportRow>, DbError> {
    let row = sqlx::query_as::<_, DailyReportRow>(
        "SELECT id, report_date, executive_summary, market_overview, key_insights, \
                sentiment_counts, top_keywords, article_ids, article_count, created_at \
         FROM daily_reports \
         ORDER BY report_date DESC, id DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert or replace the report for `report.report_date`. Returns the report id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_daily_report(
    pool: &PgPool,
    report: &DailyReportRecord,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO daily_reports \
           (report_date, executive_summary, market_overview, key_insights, \
            sentiment_counts, top_keywords, article_ids, article_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (report_date) DO UPDATE SET \
           executive_summary = EXCLUDED.executive_summary, \
           market_overview = EXCLUDED.market_overview, \
           key_insights = EXCLUDED.key_insights, \
           sentiment_counts = EXCLUDED.sentiment_counts, \
           top_keywords = EXCLUDED.top_keywords, \
           article_ids = EXCLUDED.article_ids, \
           article_count = EXCLUDED.article_count \
         RETURNING id",
    )
    .bind(report.report_date)
    .bind(Json(&report.executive_summary))
    .bind(Json(&report.market_overview))
    .bind(Json(&report.key_insights))
    .bind(Json(&report.sentiment_counts))
    .bind(&report.top_keywords)
    .bind(&report.article_ids)
    .bind(report.article_count())
    .fetch_one(pool)
    .await?;
    Ok(id)
}
