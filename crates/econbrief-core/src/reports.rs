//! Report payloads. These are stored as JSONB and decoded back into the same
//! types, so field names here are the persisted shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::articles::{AudienceImpact, Sentiment};
use crate::preferences::{SentimentBias, WeightedCategory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub text: String,
    #[serde(default)]
    pub article_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub headline: String,
    pub overview: String,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub change: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSection {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub key_data_points: Vec<DataPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOverview {
    #[serde(default)]
    pub sections: Vec<MarketSection>,
    #[serde(default)]
    pub outlook: Option<String>,
    #[serde(default)]
    pub watch_list: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeHorizon {
    ShortTerm,
    MidTerm,
    LongTerm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInsight {
    pub title: String,
    pub description: String,
    pub impact_level: ImpactLevel,
    pub time_horizon: TimeHorizon,
    #[serde(default)]
    pub implications: AudienceImpact,
    #[serde(default)]
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: i32,
    pub negative: i32,
    pub neutral: i32,
}

/// The weighting a personalized report was generated with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    #[serde(default)]
    pub categories: Vec<WeightedCategory>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sentiment_bias: Option<SentimentBias>,
}

/// A daily report as delivered by the report generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReportRecord {
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
}

impl DailyReportRecord {
    /// Stored article count; always the length of the embedded id list.
    #[must_use]
    pub fn article_count(&self) -> i32 {
        i32::try_from(self.article_ids.len()).unwrap_or(i32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedReportRecord {
    #[serde(flatten)]
    pub report: DailyReportRecord,
    pub preference_snapshot: PreferenceSnapshot,
}

/// Parse a `YYYY-MM-DD` path segment.
///
/// # Errors
///
/// Returns [`crate::ValidationError::InvalidDate`] for anything else.
pub fn parse_report_date(raw: &str) -> Result<NaiveDate, crate::ValidationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| crate::ValidationError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::Category;

    #[test]
    fn personalized_record_flattens_report_fields() {
        let record: PersonalizedReportRecord = serde_json::from_value(serde_json::json!({
            "report_date": "2025-03-04",
            "executive_summary": {
                "headline": "Rates on hold",
                "overview": "Markets were calm.",
                "sentiment": "neutral"
            },
            "article_ids": [3, 1, 2],
            "preference_snapshot": {
                "categories": [{ "category": "finance", "weight": 0.8 }],
                "keywords": ["rates"]
            }
        }))
        .expect("deserialize");

        assert_eq!(record.report.article_count(), 3);
        assert_eq!(record.report.executive_summary.sentiment, Sentiment::Neutral);
        assert_eq!(
            record.preference_snapshot.categories[0].category,
            Category::Finance
        );
        assert!(record.report.key_insights.is_empty());
    }

    #[test]
    fn key_insight_enums_use_snake_case() {
        let insight = KeyInsight {
            title: "Housing cools".to_string(),
            description: "Mortgage demand down".to_string(),
            impact_level: ImpactLevel::High,
            time_horizon: TimeHorizon::ShortTerm,
            implications: AudienceImpact::default(),
            action_items: vec![],
        };
        let json = serde_json::to_value(&insight).expect("serialize");
        assert_eq!(json["impact_level"], "high");
        assert_eq!(json["time_horizon"], "short_term");
    }

    #[test]
    fn parse_report_date_accepts_iso_dates_only() {
        assert_eq!(
            parse_report_date("2025-03-04").ok(),
            NaiveDate::from_ymd_opt(2025, 3, 4)
        );
        assert!(parse_report_date("04/03/2025").is_err());
        assert!(parse_report_date("latest").is_err());
    }
}
