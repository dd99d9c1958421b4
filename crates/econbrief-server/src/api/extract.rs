//! Axum extractors whose rejections use the API error envelope.
//!
//! The stock `Query`, `Path` and `Json` extractors answer malformed input with
//! plain-text bodies (and 422 for bad JSON). These wrappers delegate to them
//! and turn any rejection into a `validation_error`.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::middleware::RequestId;

use super::ApiError;

fn rejected(request_id: String, message: String) -> ApiError {
    tracing::debug!(error = %message, "rejected malformed request");
    ApiError::new(request_id, "validation_error", message)
}

/// Query string parameters.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejected(
                RequestId::current(&parts.extensions),
                rejection.body_text(),
            )),
        }
    }
}

/// Typed path segments.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejected(
                RequestId::current(&parts.extensions),
                rejection.body_text(),
            )),
        }
    }
}

/// JSON request body. Must be the last handler argument.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = RequestId::current(req.extensions());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejected(request_id, rejection.body_text())),
        }
    }
}
