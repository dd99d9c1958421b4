use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use econbrief_core::articles::{AudienceImpact, RelatedContext};
use econbrief_core::ArticleFilters;
use econbrief_db::ArticleRow;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::extract::{ApiPath, ApiQuery};
use super::{
    map_db_error, ok, parse_page_params, validation_error, ApiError, ApiResponse, AppState,
    PageBody,
};

pub(super) const DEFAULT_ARTICLE_LIMIT: i64 = 12;

#[derive(Debug, Deserialize)]
pub(super) struct ArticlesQuery {
    pub category: Option<String>,
    pub region: Option<String>,
    pub q: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_total: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ArticleItem {
    id: i64,
    title: String,
    link: String,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    source: Option<String>,
    region: Option<String>,
    category: Option<String>,
    headline_summary: Option<String>,
    so_what: Option<String>,
    impact_analysis: Option<AudienceImpact>,
    related_context: Option<RelatedContext>,
    sentiment: Option<String>,
    importance_score: Option<i16>,
    keywords: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<ArticleRow> for ArticleItem {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            link: row.link,
            description: row.description,
            published_at: row.published_at,
            source: row.source,
            region: row.region,
            category: row.category,
            headline_summary: row.headline_summary,
            so_what: row.so_what,
            impact_analysis: row.impact_analysis.map(|j| j.0),
            related_context: row.related_context.map(|j| j.0),
            sentiment: row.sentiment,
            importance_score: row.importance_score,
            keywords: row.keywords,
            created_at: row.created_at,
        }
    }
}

/// GET /api/v1/articles
pub(super) async fn list_articles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(query): ApiQuery<ArticlesQuery>,
) -> Result<Json<ApiResponse<PageBody<ArticleItem>>>, ApiError> {
    let rid = &req_id.0;

    let filters = ArticleFilters::parse(
        query.category.as_deref(),
        query.region.as_deref(),
        query.q.as_deref(),
    )
    .map_err(|e| validation_error(rid, &e))?;
    let page_req = parse_page_params(
        rid,
        query.cursor.as_deref(),
        query.limit,
        DEFAULT_ARTICLE_LIMIT,
    )?;

    let page = econbrief_db::fetch_articles_page(
        &state.pool,
        &filters,
        page_req.cursor.as_ref(),
        page_req.limit,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let mut body = PageBody::from_page(page, ArticleItem::from);
    if query.include_total {
        let total = econbrief_db::count_articles(&state.pool, &filters)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        body.total = Some(total);
    }

    Ok(ok(req_id.0, body))
}

/// GET /api/v1/articles/{id}
///
/// `data` is `null` when the article does not exist.
pub(super) async fn get_article(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Option<ArticleItem>>>, ApiError> {
    let row = econbrief_db::get_article(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(req_id.0, row.map(ArticleItem::from)))
}
