//! Wire types for the econbrief HTTP API.

use chrono::{DateTime, NaiveDate, Utc};
use econbrief_core::articles::{AudienceImpact, RelatedContext};
use econbrief_core::reports::{ExecutiveSummary, KeyInsight, MarketOverview, SentimentCounts};
use econbrief_core::{Category, PreferenceSnapshot, Region};
use serde::{Deserialize, Serialize};

/// Success envelope: `{ "data": ..., "meta": ... }`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Error envelope: `{ "error": { "code", "message" }, "meta": ... }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// One page of a cursor feed. `next_cursor` is opaque; pass it back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    #[serde(default)]
    pub total: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub headline_summary: Option<String>,
    #[serde(default)]
    pub so_what: Option<String>,
    #[serde(default)]
    pub impact_analysis: Option<AudienceImpact>,
    #[serde(default)]
    pub related_context: Option<RelatedContext>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub importance_score: Option<i16>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkedArticle {
    pub bookmarked_at: DateTime<Utc>,
    #[serde(flatten)]
    pub article: Article,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub id: i64,
    pub report_date: NaiveDate,
    pub executive_summary: ExecutiveSummary,
    #[serde(default)]
    pub market_overview: MarketOverview,
    #[serde(default)]
    pub key_insights: Vec<KeyInsight>,
    #[serde(default)]
    pub sentiment_counts: SentimentCounts,
    #[serde(default)]
    pub top_keywords: Vec<String>,
    #[serde(default)]
    pub article_ids: Vec<i64>,
    pub article_count: i32,
    /// Present on detail reads only.
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedReport {
    #[serde(flatten)]
    pub report: DailyReport,
    pub preference_snapshot: PreferenceSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct BookmarkStatus {
    pub bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct BatchBookmarkStatus {
    pub bookmarked_ids: Vec<i64>,
}

/// Article feed filters. `None` means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub category: Option<Category>,
    pub region: Option<Region>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl ArticleQuery {
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = self.category {
            params.push(("category", category.as_str().to_string()));
        }
        if let Some(region) = self.region {
            params.push(("region", region.as_str().to_string()));
        }
        if let Some(q) = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Caller identity forwarded to the API as gateway headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            name: None,
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_query_params_skip_absent_and_blank_values() {
        let query = ArticleQuery {
            category: Some(Category::RealEstate),
            region: None,
            search: Some("   ".to_string()),
            limit: Some(5),
        };
        assert_eq!(
            query.params(),
            vec![
                ("category", "real_estate".to_string()),
                ("limit", "5".to_string())
            ]
        );
        assert!(ArticleQuery::default().params().is_empty());
    }

    #[test]
    fn page_response_accepts_missing_total() {
        let page: PageResponse<i64> = serde_json::from_value(serde_json::json!({
            "items": [1, 2],
            "next_cursor": null,
            "has_more": false
        }))
        .expect("page");
        assert_eq!(page.total, None);
        assert_eq!(page.items, vec![1, 2]);
    }
}
