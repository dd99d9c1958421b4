use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use econbrief_core::{SentimentBias, UserPreferences, WeightedCategory};
use econbrief_db::PreferencesRow;
use serde::Serialize;

use crate::identity::Caller;
use crate::middleware::RequestId;

use super::extract::ApiJson;
use super::{map_db_error, ok, validation_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct PreferencesItem {
    categories: Vec<WeightedCategory>,
    keywords: Vec<String>,
    preferred_sources: Vec<String>,
    sentiment_bias: Option<SentimentBias>,
    updated_at: DateTime<Utc>,
}

impl From<PreferencesRow> for PreferencesItem {
    fn from(row: PreferencesRow) -> Self {
        let updated_at = row.updated_at;
        let prefs = row.into_preferences();
        Self {
            categories: prefs.categories,
            keywords: prefs.keywords,
            preferred_sources: prefs.preferred_sources,
            sentiment_bias: prefs.sentiment_bias,
            updated_at,
        }
    }
}

/// GET /api/v1/me/preferences
///
/// `null` until the caller saves preferences.
pub(super) async fn get_my_preferences(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    caller: Caller,
) -> Result<Json<ApiResponse<Option<PreferencesItem>>>, ApiError> {
    let Some(user) = econbrief_db::get_user_by_external_id(&state.pool, &caller.external_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    else {
        return Ok(ok(req_id.0, None));
    };

    let row = econbrief_db::get_preferences(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ok(req_id.0, row.map(PreferencesItem::from)))
}

/// PUT /api/v1/me/preferences
///
/// Validates, then replaces the caller's preferences.
pub(super) async fn put_my_preferences(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    caller: Caller,
    ApiJson(body): ApiJson<UserPreferences>,
) -> Result<Json<ApiResponse<PreferencesItem>>, ApiError> {
    let prefs = body
        .normalized()
        .map_err(|e| validation_error(&req_id.0, &e))?;

    let user = econbrief_db::get_or_create_user(&state.pool, &caller.profile())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let row = econbrief_db::upsert_preferences(&state.pool, user.id, &prefs)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(user_id = user.id, "preferences updated");
    Ok(ok(req_id.0, PreferencesItem::from(row)))
}
