//! Daily and personalized report handlers.
//!
//! Reports reference their articles through an embedded id list; detail
//! endpoints resolve that list at read time, preserving its order.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use econbrief_core::reports::{
    parse_report_date, ExecutiveSummary, KeyInsight, MarketOverview, SentimentCounts,
};
use econbrief_core::PreferenceSnapshot;
use econbrief_db::{DailyReportRow, PersonalizedReportRow};
use serde::Serialize;
use sqlx::PgPool;

use crate::identity::Caller;
use crate::middleware::RequestId;

use super::articles::ArticleItem;
use super::extract::{ApiPath, ApiQuery};
use super::{
    map_db_error, ok, validation_error, ApiError, ApiResponse, AppState, PageBody, PageQuery,
};

const DEFAULT_REPORT_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub(super) struct DailyReportItem {
    id: i64,
    report_date: NaiveDate,
    executive_summary: ExecutiveSummary,
    market_overview: MarketOverview,
    key_insights: Vec<KeyInsight>,
    sentiment_counts: SentimentCounts,
    top_keywords: Vec<String>,
    article_ids: Vec<i64>,
    article_count: i32,
    created_at: DateTime<Utc>,
}

impl From<DailyReportRow> for DailyReportItem {
    fn from(row: DailyReportRow) -> Self {
        Self {
            id: row.id,
            report_date: row.report_date,
            executive_summary: row.executive_summary.0,
            market_overview: row.market_overview.0,
            key_insights: row.key_insights.0,
            sentiment_counts: row.sentiment_counts.0,
            top_keywords: row.top_keywords,
            article_ids: row.article_ids,
            article_count: row.article_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PersonalizedReportItem {
    #[serde(flatten)]
    report: DailyReportItem,
    preference_snapshot: PreferenceSnapshot,
}

impl From<PersonalizedReportRow> for PersonalizedReportItem {
    fn from(row: PersonalizedReportRow) -> Self {
        Self {
            report: DailyReportItem {
                id: row.id,
                report_date: row.report_date,
                executive_summary: row.executive_summary.0,
                market_overview: row.market_overview.0,
                key_insights: row.key_insights.0,
                sentiment_counts: row.sentiment_counts.0,
                top_keywords: row.top_keywords,
                article_ids: row.article_ids,
                article_count: row.article_count,
                created_at: row.created_at,
            },
            preference_snapshot: row.preference_snapshot.0,
        }
    }
}

/// A report together with its resolved articles.
#[derive(Debug, Serialize)]
pub(super) struct ReportDetail<R: Serialize> {
    #[serde(flatten)]
    report: R,
    articles: Vec<ArticleItem>,
}

async fn with_articles<R: Serialize>(
    pool: &PgPool,
    request_id: &str,
    report: R,
    article_ids: &[i64],
) -> Result<ReportDetail<R>, ApiError> {
    let articles = econbrief_db::resolve_articles(pool, article_ids)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    Ok(ReportDetail {
        report,
        articles: articles.into_iter().map(ArticleItem::from).collect(),
    })
}

fn parse_date(request_id: &str, raw: &str) -> Result<NaiveDate, ApiError> {
    parse_report_date(raw).map_err(|e| validation_error(request_id, &e))
}

/// GET /api/v1/reports/daily
pub(super) async fn list_daily_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<PageBody<DailyReportItem>>>, ApiError> {
    let page_req = query.resolve(&req_id.0, DEFAULT_REPORT_LIMIT)?;

    let page = econbrief_db::fetch_daily_reports_page(
        &state.pool,
        page_req.cursor.as_ref(),
        page_req.limit,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(req_id.0, PageBody::from_page(page, DailyReportItem::from)))
}

/// GET /api/v1/reports/daily/latest
pub(super) async fn latest_daily_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Option<DailyReportItem>>>, ApiError> {
    let row = econbrief_db::get_latest_daily_report(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(req_id.0, row.map(DailyReportItem::from)))
}

/// GET /api/v1/reports/daily/{date}
pub(super) async fn daily_report_by_date(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(raw_date): ApiPath<String>,
) -> Result<Json<ApiResponse<Option<ReportDetail<DailyReportItem>>>>, ApiError> {
    let date = parse_date(&req_id.0, &raw_date)?;

    let Some(row) = econbrief_db::get_daily_report_by_date(&state.pool, date)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    else {
        return Ok(ok(req_id.0, None));
    };

    let article_ids = row.article_ids.clone();
    let detail = with_articles(
        &state.pool,
        &req_id.0,
        DailyReportItem::from(row),
        &article_ids,
    )
    .await?;
    Ok(ok(req_id.0, Some(detail)))
}

/// GET /api/v1/me/reports
pub(super) async fn list_my_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    caller: Caller,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<PageBody<PersonalizedReportItem>>>, ApiError> {
    let page_req = query.resolve(&req_id.0, DEFAULT_REPORT_LIMIT)?;

    // Reads never materialize a user; an unknown caller simply has no reports.
    let Some(user) = econbrief_db::get_user_by_external_id(&state.pool, &caller.external_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    else {
        return Ok(ok(req_id.0, PageBody::empty()));
    };

    let page = econbrief_db::fetch_personalized_reports_page(
        &state.pool,
        user.id,
        page_req.cursor.as_ref(),
        page_req.limit,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(
        req_id.0,
        PageBody::from_page(page, PersonalizedReportItem::from),
    ))
}

/// GET /api/v1/me/reports/{date}
pub(super) async fn my_report_by_date(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    caller: Caller,
    ApiPath(raw_date): ApiPath<String>,
) -> Result<Json<ApiResponse<Option<ReportDetail<PersonalizedReportItem>>>>, ApiError> {
    let date = parse_date(&req_id.0, &raw_date)?;

    let Some(user) = econbrief_db::get_user_by_external_id(&state.pool, &caller.external_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    else {
        return Ok(ok(req_id.0, None));
    };

    let Some(row) = econbrief_db::get_personalized_report_by_date(&state.pool, user.id, date)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    else {
        return Ok(ok(req_id.0, None));
    };

    let article_ids = row.article_ids.clone();
    let detail = with_articles(
        &state.pool,
        &req_id.0,
        PersonalizedReportItem::from(row),
        &article_ids,
    )
    .await?;
    Ok(ok(req_id.0, Some(detail)))
}
