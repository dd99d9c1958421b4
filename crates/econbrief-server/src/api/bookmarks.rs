//! Bookmark handlers.
//!
//! Status reads tolerate anonymous callers and answer "not bookmarked";
//! toggling requires an identity and materializes the user row on first use.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use econbrief_db::{BookmarkedArticleRow, DbError};
use serde::{Deserialize, Serialize};

use crate::identity::{Caller, MaybeCaller};
use crate::middleware::RequestId;

use super::articles::{ArticleItem, DEFAULT_ARTICLE_LIMIT};
use super::extract::{ApiPath, ApiQuery};
use super::{map_db_error, ok, ApiError, ApiResponse, AppState, PageBody, PageQuery};

pub(super) const MAX_BATCH_IDS: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct BatchStatusQuery {
    pub ids: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct BookmarkStatus {
    bookmarked: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct BatchBookmarkStatus {
    bookmarked_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct BookmarkedArticleItem {
    bookmarked_at: DateTime<Utc>,
    #[serde(flatten)]
    article: ArticleItem,
}

impl From<BookmarkedArticleRow> for BookmarkedArticleItem {
    fn from(row: BookmarkedArticleRow) -> Self {
        Self {
            bookmarked_at: row.bookmarked_at,
            article: ArticleItem::from(row.article),
        }
    }
}

/// Parse `ids=1,2,3` into a deduplicated, ascending id list.
fn parse_ids(request_id: &str, raw: Option<&str>) -> Result<Vec<i64>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::new();
    for part in raw.split(',') {
        let id = part
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ApiError::new(
                    request_id,
                    "validation_error",
                    format!("ids must be positive integers, got '{}'", part.trim()),
                )
            })?;
        ids.push(id);
    }

    ids.sort_unstable();
    ids.dedup();
    if ids.len() > MAX_BATCH_IDS {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("at most {MAX_BATCH_IDS} ids per request"),
        ));
    }
    Ok(ids)
}

async fn resolve_user_id(
    state: &AppState,
    request_id: &str,
    caller: &Caller,
) -> Result<Option<i64>, ApiError> {
    econbrief_db::get_user_by_external_id(&state.pool, &caller.external_id)
        .await
        .map(|user| user.map(|u| u.id))
        .map_err(|e| map_db_error(request_id.to_owned(), &e))
}

/// GET /api/v1/bookmarks/{article_id}
pub(super) async fn bookmark_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    MaybeCaller(caller): MaybeCaller,
    ApiPath(article_id): ApiPath<i64>,
) -> Result<Json<ApiResponse<BookmarkStatus>>, ApiError> {
    let Some(caller) = caller else {
        return Ok(ok(req_id.0, BookmarkStatus { bookmarked: false }));
    };
    let Some(user_id) = resolve_user_id(&state, &req_id.0, &caller).await? else {
        return Ok(ok(req_id.0, BookmarkStatus { bookmarked: false }));
    };

    let bookmarked = econbrief_db::is_bookmarked(&state.pool, user_id, article_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(req_id.0, BookmarkStatus { bookmarked }))
}

/// GET /api/v1/bookmarks?ids=1,2,3
pub(super) async fn batch_bookmark_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    MaybeCaller(caller): MaybeCaller,
    ApiQuery(query): ApiQuery<BatchStatusQuery>,
) -> Result<Json<ApiResponse<BatchBookmarkStatus>>, ApiError> {
    let ids = parse_ids(&req_id.0, query.ids.as_deref())?;
    let none = || BatchBookmarkStatus {
        bookmarked_ids: Vec::new(),
    };

    let Some(caller) = caller else {
        return Ok(ok(req_id.0, none()));
    };
    let Some(user_id) = resolve_user_id(&state, &req_id.0, &caller).await? else {
        return Ok(ok(req_id.0, none()));
    };

    let bookmarked_ids = econbrief_db::bookmarked_article_ids(&state.pool, user_id, &ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(req_id.0, BatchBookmarkStatus { bookmarked_ids }))
}

/// POST /api/v1/bookmarks/{article_id}/toggle
pub(super) async fn toggle_bookmark(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    caller: Caller,
    ApiPath(article_id): ApiPath<i64>,
) -> Result<Json<ApiResponse<BookmarkStatus>>, ApiError> {
    let user = econbrief_db::get_or_create_user(&state.pool, &caller.profile())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let bookmarked = match econbrief_db::toggle_bookmark(&state.pool, user.id, article_id).await {
        Ok(bookmarked) => bookmarked,
        Err(DbError::NotFound) => {
            return Err(ApiError::new(
                req_id.0,
                "not_found",
                format!("article {article_id} not found"),
            ));
        }
        Err(e) => return Err(map_db_error(req_id.0, &e)),
    };

    tracing::info!(user_id = user.id, article_id, bookmarked, "bookmark toggled");
    Ok(ok(req_id.0, BookmarkStatus { bookmarked }))
}

/// GET /api/v1/me/bookmarks
pub(super) async fn list_my_bookmarks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    caller: Caller,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<PageBody<BookmarkedArticleItem>>>, ApiError> {
    let page_req = query.resolve(&req_id.0, DEFAULT_ARTICLE_LIMIT)?;

    let Some(user_id) = resolve_user_id(&state, &req_id.0, &caller).await? else {
        return Ok(ok(req_id.0, PageBody::empty()));
    };

    let page = econbrief_db::fetch_bookmarked_articles_page(
        &state.pool,
        user_id,
        page_req.cursor.as_ref(),
        page_req.limit,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(
        req_id.0,
        PageBody::from_page(page, BookmarkedArticleItem::from),
    ))
}
