//! Caller identity as forwarded by the auth gateway.
//!
//! The gateway sets `x-user-id` (plus optional profile headers) on requests
//! from signed-in users. Handlers that need an identity take [`Caller`], which
//! rejects anonymous requests with `unauthorized`; read-only handlers take
//! [`MaybeCaller`] and treat anonymous callers as having no data.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use econbrief_db::UserProfile;

use crate::api::ApiError;
use crate::middleware::RequestId;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_AVATAR_HEADER: &str = "x-user-avatar";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Caller {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let external_id = header_value(headers, USER_ID_HEADER)?;
        Some(Self {
            external_id,
            email: header_value(headers, USER_EMAIL_HEADER),
            name: header_value(headers, USER_NAME_HEADER),
            avatar_url: header_value(headers, USER_AVATAR_HEADER),
        })
    }

    pub fn profile(&self) -> UserProfile<'_> {
        UserProfile {
            external_id: &self.external_id,
            email: self.email.as_deref(),
            name: self.name.as_deref(),
            avatar_url: self.avatar_url.as_deref(),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers).ok_or_else(|| {
            ApiError::new(RequestId::current(&parts.extensions), "unauthorized", "sign-in required")
        })
    }
}

/// Identity if present; never rejects.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

impl<S> FromRequestParts<S> for MaybeCaller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeCaller(Caller::from_headers(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn caller_requires_non_blank_user_id() {
        let mut headers = HeaderMap::new();
        assert!(Caller::from_headers(&headers).is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert!(Caller::from_headers(&headers).is_none());
    }

    #[test]
    fn caller_collects_optional_profile_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("user_123"));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("a@example.com"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static(""));

        let caller = Caller::from_headers(&headers).expect("caller");
        assert_eq!(caller.external_id, "user_123");
        assert_eq!(caller.email.as_deref(), Some("a@example.com"));
        assert_eq!(caller.name, None);

        let profile = caller.profile();
        assert_eq!(profile.external_id, "user_123");
        assert_eq!(profile.avatar_url, None);
    }
}
