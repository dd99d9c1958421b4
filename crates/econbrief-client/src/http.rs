//! HTTP client for the econbrief reader API.
//!
//! Wraps `reqwest` with envelope unwrapping, gateway identity headers, and
//! typed response deserialization. Non-2xx answers surface as
//! [`ClientError::Api`], or [`ClientError::Unauthorized`] for 401.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use econbrief_core::UserPreferences;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::coordinator::BookmarkApi;
use crate::error::ClientError;
use crate::types::{
    Article, ArticleQuery, BatchBookmarkStatus, BookmarkStatus, BookmarkedArticle, DailyReport,
    Envelope, ErrorEnvelope, Identity, PageResponse, PersonalizedReport,
};

const USER_ID_HEADER: &str = "x-user-id";
const USER_EMAIL_HEADER: &str = "x-user-email";
const USER_NAME_HEADER: &str = "x-user-name";
const USER_AVATAR_HEADER: &str = "x-user-avatar";

/// Client for the econbrief API.
///
/// Use [`ApiClient::with_base_url`] to build one and
/// [`ApiClient::with_identity`] to act as a signed-in reader.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    identity: Option<Identity>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("econbrief-client/0.1")
            .build()?;

        // Exactly one trailing slash so relative joins append to the path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            base_url,
            identity: None,
        })
    }

    /// Same client, sending `identity` on every request.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// One page of the article feed.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the server rejects the filters or cursor.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the page does not match the expected shape.
    pub async fn fetch_articles(
        &self,
        query: &ArticleQuery,
        cursor: Option<&str>,
    ) -> Result<PageResponse<Article>, ClientError> {
        let mut params = query.params();
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_owned()));
        }
        let url = self.build_url("api/v1/articles", &params)?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// `Ok(None)` when the article does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_articles`].
    pub async fn fetch_article(&self, id: i64) -> Result<Option<Article>, ClientError> {
        let url = self.build_url(&format!("api/v1/articles/{id}"), &[])?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_articles`].
    pub async fn fetch_daily_reports(
        &self,
        cursor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<PageResponse<DailyReport>, ClientError> {
        let url = self.build_url("api/v1/reports/daily", &page_params(cursor, limit))?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_articles`].
    pub async fn fetch_latest_daily_report(&self) -> Result<Option<DailyReport>, ClientError> {
        let url = self.build_url("api/v1/reports/daily/latest", &[])?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// # Errors
    ///
    /// Same as [`ApiClient::fetch_articles`].
    pub async fn fetch_daily_report(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailyReport>, ClientError> {
        let url = self.build_url(
            &format!("api/v1/reports/daily/{}", date.format("%Y-%m-%d")),
            &[],
        )?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// # Errors
    ///
    /// [`ClientError::Unauthorized`] without an identity; otherwise as
    /// [`ApiClient::fetch_articles`].
    pub async fn fetch_my_reports(
        &self,
        cursor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<PageResponse<PersonalizedReport>, ClientError> {
        let url = self.build_url("api/v1/me/reports", &page_params(cursor, limit))?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// # Errors
    ///
    /// [`ClientError::Unauthorized`] without an identity; otherwise as
    /// [`ApiClient::fetch_articles`].
    pub async fn fetch_my_bookmarks(
        &self,
        cursor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<PageResponse<BookmarkedArticle>, ClientError> {
        let url = self.build_url("api/v1/me/bookmarks", &page_params(cursor, limit))?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// # Errors
    ///
    /// [`ClientError::Unauthorized`] without an identity; otherwise as
    /// [`ApiClient::fetch_articles`].
    pub async fn fetch_preferences(&self) -> Result<Option<UserPreferences>, ClientError> {
        let url = self.build_url("api/v1/me/preferences", &[])?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// Replace the caller's preferences and return what the server stored.
    ///
    /// # Errors
    ///
    /// [`ClientError::Api`] with `validation_error` for out-of-range weights;
    /// otherwise as [`ApiClient::fetch_preferences`].
    pub async fn save_preferences(
        &self,
        preferences: &UserPreferences,
    ) -> Result<UserPreferences, ClientError> {
        let url = self.build_url("api/v1/me/preferences", &[])?;
        self.send(Method::PUT, url, Some(preferences)).await
    }

    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{}{path}: {e}", self.base_url)))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn with_identity_headers(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(identity) = &self.identity {
            request = request.header(USER_ID_HEADER, &identity.user_id);
            if let Some(email) = &identity.email {
                request = request.header(USER_EMAIL_HEADER, email);
            }
            if let Some(name) = &identity.name {
                request = request.header(USER_NAME_HEADER, name);
            }
            if let Some(avatar) = &identity.avatar_url {
                request = request.header(USER_AVATAR_HEADER, avatar);
            }
        }
        request
    }

    /// Sends a request and unwraps the `data` field of the success envelope.
    async fn send<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let context = format!("{method} {}", url.path());
        let mut request = self.with_identity_headers(self.client.request(method, url));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Self::error_from(status, &text));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ClientError::Deserialize {
                context,
                source: e,
            })?;
        Ok(envelope.data)
    }

    fn error_from(status: StatusCode, body: &str) -> ClientError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        if status == StatusCode::UNAUTHORIZED {
            let message = parsed.map_or_else(|| "unauthorized".to_string(), |e| e.error.message);
            return ClientError::Unauthorized(message);
        }
        match parsed {
            Some(envelope) => ClientError::Api {
                status: status.as_u16(),
                code: envelope.error.code,
                message: envelope.error.message,
            },
            None => ClientError::Api {
                status: status.as_u16(),
                code: "http_error".to_string(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            },
        }
    }
}

fn page_params(cursor: Option<&str>, limit: Option<i64>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor.to_owned()));
    }
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

#[async_trait]
impl BookmarkApi for ApiClient {
    async fn toggle(&self, article_id: i64) -> Result<bool, ClientError> {
        let url = self.build_url(&format!("api/v1/bookmarks/{article_id}/toggle"), &[])?;
        let status: BookmarkStatus = self.send(Method::POST, url, None::<&()>).await?;
        Ok(status.bookmarked)
    }

    async fn status(&self, article_id: i64) -> Result<bool, ClientError> {
        let url = self.build_url(&format!("api/v1/bookmarks/{article_id}"), &[])?;
        let status: BookmarkStatus = self.send(Method::GET, url, None::<&()>).await?;
        Ok(status.bookmarked)
    }

    async fn batch_status(&self, article_ids: &[i64]) -> Result<Vec<i64>, ClientError> {
        let ids = article_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.build_url("api/v1/bookmarks", &[("ids", ids)])?;
        let status: BatchBookmarkStatus = self.send(Method::GET, url, None::<&()>).await?;
        Ok(status.bookmarked_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> ApiClient {
        ApiClient::with_base_url(base_url, 30).expect("client construction should not fail")
    }

    #[test]
    fn build_url_joins_under_base_path() {
        let client = test_client("https://news.example.com/backend/");
        let url = client
            .build_url("api/v1/articles", &[("limit", "5".to_string())])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://news.example.com/backend/api/v1/articles?limit=5"
        );
    }

    #[test]
    fn build_url_encodes_opaque_cursor() {
        let client = test_client("https://news.example.com");
        let cursor = r#"{"primary_key":null,"id":4}"#;
        let url = client
            .build_url("api/v1/articles", &[("cursor", cursor.to_string())])
            .expect("url");
        let (_, value) = url
            .query_pairs()
            .find(|(k, _)| k == "cursor")
            .expect("cursor param");
        assert_eq!(value, cursor);
        assert!(!url.as_str().contains('"'));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ApiClient::with_base_url("not a url", 30).expect_err("should fail");
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
    }

    #[test]
    fn error_without_envelope_falls_back_to_status() {
        let err = ApiClient::error_from(StatusCode::BAD_GATEWAY, "<html>");
        assert!(matches!(
            err,
            ClientError::Api { status: 502, ref code, .. } if code == "http_error"
        ));
        assert!(ApiClient::error_from(StatusCode::UNAUTHORIZED, "").is_unauthorized());
    }
}
