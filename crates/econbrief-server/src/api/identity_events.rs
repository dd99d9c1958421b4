//! Identity lifecycle events pushed by the auth provider's sync service.
//!
//! Created and updated users are mirrored into `users` (profile fields
//! overwritten); deleted users are removed along with their bookmarks,
//! preferences and personalized reports. Unknown event types are
//! acknowledged and ignored so the sender does not retry them.

use axum::{extract::State, Extension, Json};
use econbrief_db::UserProfile;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::extract::ApiJson;
use super::{map_db_error, ok, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct IdentityEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: IdentityData,
}

#[derive(Debug, Deserialize)]
pub(super) struct IdentityData {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct EventReceipt {
    event_type: String,
    handled: bool,
}

/// POST /api/v1/identity/events
pub(super) async fn receive_identity_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(event): ApiJson<IdentityEvent>,
) -> Result<Json<ApiResponse<EventReceipt>>, ApiError> {
    let external_id = event.data.id.trim();
    if external_id.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "data.id must not be empty",
        ));
    }

    let handled = match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let profile = UserProfile {
                external_id,
                email: non_blank(event.data.email.as_deref()),
                name: non_blank(event.data.name.as_deref()),
                avatar_url: non_blank(event.data.avatar_url.as_deref()),
            };
            let user = econbrief_db::upsert_user_profile(&state.pool, &profile)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
            tracing::info!(user_id = user.id, event = %event.event_type, "mirrored identity");
            true
        }
        "user.deleted" => {
            let removed = econbrief_db::delete_user_by_external_id(&state.pool, external_id)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
            tracing::info!(external_id, removed, "deleted mirrored identity");
            true
        }
        other => {
            tracing::debug!(event = other, "ignoring identity event");
            false
        }
    };

    Ok(ok(
        req_id.0,
        EventReceipt {
            event_type: event.event_type,
            handled,
        },
    ))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
