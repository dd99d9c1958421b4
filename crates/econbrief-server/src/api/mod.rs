mod articles;
mod bookmarks;
mod extract;
mod identity_events;
mod preferences;
mod reports;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use econbrief_core::{Cursor, Page, ValidationError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::identity::{USER_AVATAR_HEADER, USER_EMAIL_HEADER, USER_ID_HEADER, USER_NAME_HEADER};
use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

/// Wire shape of one feed page. `next_cursor` is the opaque token to echo
/// back as `?cursor=`.
#[derive(Debug, Serialize)]
pub struct PageBody<T: Serialize> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl<T: Serialize> PageBody<T> {
    pub(super) fn from_page<R, F>(page: Page<R>, convert: F) -> Self
    where
        F: FnMut(R) -> T,
    {
        let page = page.map(convert);
        Self {
            items: page.items,
            next_cursor: page.next_cursor.map(|c| c.encode()),
            has_more: page.has_more,
            total: None,
        }
    }

    pub(super) fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
            total: None,
        }
    }
}

/// Query parameters shared by every cursor feed.
#[derive(Debug, Default, Deserialize)]
pub(super) struct PageQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// Validated cursor and limit for one page request.
#[derive(Debug, Clone, Copy)]
pub(super) struct PageRequest {
    pub cursor: Option<Cursor>,
    pub limit: i64,
}

impl PageQuery {
    pub(super) fn resolve(
        &self,
        request_id: &str,
        default_limit: i64,
    ) -> Result<PageRequest, ApiError> {
        parse_page_params(request_id, self.cursor.as_deref(), self.limit, default_limit)
    }
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

/// HTTP status for an error code; unknown codes are server faults.
fn status_for_code(code: &str) -> StatusCode {
    match code {
        "validation_error" | "bad_request" => StatusCode::BAD_REQUEST,
        "unauthorized" => StatusCode::UNAUTHORIZED,
        "not_found" => StatusCode::NOT_FOUND,
        "conflict" => StatusCode::CONFLICT,
        "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (status_for_code(&self.error.code), Json(self)).into_response()
    }
}

pub(super) fn ok<T: Serialize>(request_id: String, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(request_id),
    })
}

pub(super) fn map_db_error(request_id: String, error: &econbrief_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn validation_error(request_id: &str, error: &ValidationError) -> ApiError {
    tracing::debug!(error = %error, "rejected request");
    ApiError::new(request_id, "validation_error", error.to_string())
}

pub(super) fn parse_page_params(
    request_id: &str,
    cursor: Option<&str>,
    limit: Option<i64>,
    default_limit: i64,
) -> Result<PageRequest, ApiError> {
    let limit = econbrief_core::resolve_limit(limit, default_limit)
        .map_err(|e| validation_error(request_id, &e))?;
    let cursor = cursor
        .filter(|raw| !raw.trim().is_empty())
        .map(Cursor::decode)
        .transpose()
        .map_err(|e| validation_error(request_id, &e))?;
    Ok(PageRequest { cursor, limit })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_EMAIL_HEADER),
            HeaderName::from_static(USER_NAME_HEADER),
            HeaderName::from_static(USER_AVATAR_HEADER),
        ])
}

fn reader_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/articles", get(articles::list_articles))
        .route("/api/v1/articles/{id}", get(articles::get_article))
        .route("/api/v1/reports/daily", get(reports::list_daily_reports))
        .route(
            "/api/v1/reports/daily/latest",
            get(reports::latest_daily_report),
        )
        .route(
            "/api/v1/reports/daily/{date}",
            get(reports::daily_report_by_date),
        )
        .route("/api/v1/bookmarks", get(bookmarks::batch_bookmark_status))
        .route(
            "/api/v1/bookmarks/{article_id}",
            get(bookmarks::bookmark_status),
        )
        .route(
            "/api/v1/bookmarks/{article_id}/toggle",
            post(bookmarks::toggle_bookmark),
        )
        .route("/api/v1/me/bookmarks", get(bookmarks::list_my_bookmarks))
        .route("/api/v1/me/reports", get(reports::list_my_reports))
        .route("/api/v1/me/reports/{date}", get(reports::my_report_by_date))
        .route(
            "/api/v1/me/preferences",
            get(preferences::get_my_preferences).put(preferences::put_my_preferences),
        )
}

fn service_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/identity/events",
            post(identity_events::receive_identity_event),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .merge(reader_router())
        .merge(service_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(CompressionLayer::new())
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                )),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match econbrief_db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
