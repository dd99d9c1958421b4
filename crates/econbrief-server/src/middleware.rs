//! Request middleware shared by every route.
//!
//! Rejections are rendered through [`ApiError`], so clients always see the
//! normal error envelope with the request id in `meta`.

use std::{
    collections::BTreeSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, Extensions, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use econbrief_core::AppConfig;
use subtle::{Choice, ConstantTimeEq};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const SERVICE_KEYS_VAR: &str = "ECONBRIEF_SERVICE_KEYS";

/// Correlation id for one request, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse a caller-supplied `x-request-id`, or mint a v4 UUID.
    fn from_headers(headers: &HeaderMap) -> Self {
        let supplied = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        Self(supplied.map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned))
    }

    /// Id attached by [`request_id`]; empty outside that layer.
    pub(crate) fn current(extensions: &Extensions) -> String {
        extensions
            .get::<RequestId>()
            .map_or_else(String::new, |id| id.0.clone())
    }
}

/// Bearer keys accepted on service-to-service routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<[String]>,
    pub enabled: bool,
}

impl AuthState {
    /// Read comma-separated keys from `ECONBRIEF_SERVICE_KEYS`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no key is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(SERVICE_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// # Errors
    ///
    /// Fails when `raw` holds no key and `is_development` is false.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys: BTreeSet<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect();

        if !keys.is_empty() {
            return Ok(Self {
                keys: keys.into_iter().map(str::to_owned).collect(),
                enabled: true,
            });
        }
        if !is_development {
            anyhow::bail!("{SERVICE_KEYS_VAR} must list at least one bearer key outside development");
        }
        tracing::warn!("{SERVICE_KEYS_VAR} is empty; service routes are unauthenticated");
        Ok(Self {
            keys: Arc::from(Vec::new()),
            enabled: false,
        })
    }

    fn accepts(&self, token: &str) -> bool {
        // Every key is compared; no early exit.
        let matched = self
            .keys
            .iter()
            .fold(Choice::from(0), |acc, key| acc | key.as_bytes().ct_eq(token.as_bytes()));
        bool::from(matched)
    }
}

/// `Authorization: Bearer <token>`, scheme matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    used: usize,
}

/// Fixed-window request limiter shared by all routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    current: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let current = Window {
            opened: Instant::now(),
            used: 0,
        };
        Self {
            max_requests,
            window,
            current: Arc::new(Mutex::new(current)),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    async fn admit(&self) -> bool {
        let mut current = self.current.lock().await;
        let now = Instant::now();
        if now.duration_since(current.opened) >= self.window {
            *current = Window {
                opened: now,
                used: 0,
            };
        }
        if current.used >= self.max_requests {
            return false;
        }
        current.used += 1;
        true
    }
}

/// Attach a [`RequestId`] to the request and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_headers(req.headers());
    let echoed = HeaderValue::from_str(&id.0).ok();
    req.extensions_mut().insert(id);

    let mut res = next.run(req).await;
    if let Some(value) = echoed {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let authorized =
        !auth.enabled || bearer_token(req.headers()).is_some_and(|token| auth.accepts(token));
    if !authorized {
        tracing::warn!(path = %req.uri().path(), "service request rejected");
        return ApiError::new(
            RequestId::current(req.extensions()),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response();
    }
    next.run(req).await
}

pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if !limiter.admit().await {
        tracing::debug!(path = %req.uri().path(), "rate limit exceeded");
        return ApiError::new(RequestId::current(req.extensions()), "rate_limited", "rate limit exceeded")
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_header(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&auth_header("Bearer svc-key")), Some("svc-key"));
        assert_eq!(bearer_token(&auth_header("bearer  svc-key ")), Some("svc-key"));
        assert_eq!(bearer_token(&auth_header("Basic abc123")), None);
        assert_eq!(bearer_token(&auth_header("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn empty_keys_disable_auth_only_in_development() {
        let dev = AuthState::from_keys("", true).expect("development allows no keys");
        assert!(!dev.enabled);
        assert!(AuthState::from_keys(" , ", false).is_err());
    }

    #[test]
    fn only_configured_keys_are_accepted() {
        let auth = AuthState::from_keys("alpha, beta,alpha", false).expect("keys");
        assert!(auth.enabled);
        assert_eq!(auth.keys.len(), 2);
        assert!(auth.accepts("beta"));
        assert!(!auth.accepts("alph"));
        assert!(!auth.accepts("gamma"));
    }

    #[test]
    fn request_id_prefers_caller_value() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(" trace-7 "));
        assert_eq!(RequestId::from_headers(&headers).0, "trace-7");

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("   "));
        let minted = RequestId::from_headers(&headers).0;
        assert!(Uuid::parse_str(&minted).is_ok());
    }

    #[tokio::test]
    async fn limiter_rejects_past_max_within_window() {
        let limiter = RateLimitState::new(2, Duration::from_secs(60));
        assert!(limiter.admit().await);
        assert!(limiter.admit().await);
        assert!(!limiter.admit().await);
    }

    #[tokio::test]
    async fn elapsed_window_resets_the_count() {
        let limiter = RateLimitState::new(1, Duration::ZERO);
        for _ in 0..3 {
            assert!(limiter.admit().await);
        }
    }
}
