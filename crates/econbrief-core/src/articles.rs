use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_QUERY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Economy,
    Finance,
    Stock,
    RealEstate,
    Industry,
    Policy,
    Technology,
    Global,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Economy,
        Category::Finance,
        Category::Stock,
        Category::RealEstate,
        Category::Industry,
        Category::Policy,
        Category::Technology,
        Category::Global,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Economy => "economy",
            Category::Finance => "finance",
            Category::Stock => "stock",
            Category::RealEstate => "real_estate",
            Category::Industry => "industry",
            Category::Policy => "policy",
            Category::Technology => "technology",
            Category::Global => "global",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Domestic,
    Us,
    China,
    Japan,
    Europe,
    Global,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Domestic,
        Region::Us,
        Region::China,
        Region::Japan,
        Region::Europe,
        Region::Global,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Domestic => "domestic",
            Region::Us => "us",
            Region::China => "china",
            Region::Japan => "japan",
            Region::Europe => "europe",
            Region::Global => "global",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownRegion(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Per-audience commentary produced by the analysis pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceImpact {
    #[serde(default)]
    pub investors: Option<String>,
    #[serde(default)]
    pub businesses: Option<String>,
    #[serde(default)]
    pub consumers: Option<String>,
    #[serde(default)]
    pub policymakers: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedContext {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub related_topics: Vec<String>,
}

/// An analyzed article as delivered by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub headline_summary: Option<String>,
    #[serde(default)]
    pub so_what: Option<String>,
    #[serde(default)]
    pub impact_analysis: Option<AudienceImpact>,
    #[serde(default)]
    pub related_context: Option<RelatedContext>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub importance_score: Option<i16>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Validated article list filters. All present filters are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilters {
    pub category: Option<Category>,
    pub region: Option<Region>,
    pub query: Option<String>,
}

impl ArticleFilters {
    /// Validate raw query-string values.
    ///
    /// Empty values and `all` mean "no filter" for the enum filters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for unknown categories/regions or an
    /// over-long search query.
    pub fn parse(
        category: Option<&str>,
        region: Option<&str>,
        query: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let category = non_blank(category)
            .filter(|v| *v != "all")
            .map(Category::from_str)
            .transpose()?;
        let region = non_blank(region)
            .filter(|v| *v != "all")
            .map(Region::from_str)
            .transpose()?;

        let query = match non_blank(query) {
            Some(q) if q.chars().count() > MAX_QUERY_CHARS => {
                return Err(ValidationError::InvalidQuery(format!(
                    "must be at most {MAX_QUERY_CHARS} characters"
                )));
            }
            other => other.map(ToOwned::to_owned),
        };

        Ok(Self {
            category,
            region,
            query,
        })
    }

    /// `ILIKE` pattern for the free-text filter, with wildcards escaped.
    #[must_use]
    pub fn like_pattern(&self) -> Option<String> {
        self.query.as_deref().map(|q| format!("%{}%", escape_like(q)))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
