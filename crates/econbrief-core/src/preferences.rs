use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::articles::Category;
use crate::ValidationError;

const MAX_LIST_ITEMS: usize = 20;
const MAX_ITEM_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedCategory {
    pub category: Category,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBias {
    Positive,
    Negative,
    Balanced,
}

impl SentimentBias {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentBias::Positive => "positive",
            SentimentBias::Negative => "negative",
            SentimentBias::Balanced => "balanced",
        }
    }
}

impl std::str::FromStr for SentimentBias {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(SentimentBias::Positive),
            "negative" => Ok(SentimentBias::Negative),
            "balanced" => Ok(SentimentBias::Balanced),
            other => Err(ValidationError::InvalidPreferences(format!(
                "unknown sentiment bias '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub categories: Vec<WeightedCategory>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub preferred_sources: Vec<String>,
    #[serde(default)]
    pub sentiment_bias: Option<SentimentBias>,
}

impl UserPreferences {
    /// Validate and normalize a submitted preference set.
    ///
    /// Keywords and sources are trimmed and deduplicated case-insensitively,
    /// keeping the first spelling.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPreferences`] describing the first
    /// offending field.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        for wc in &self.categories {
            if !(0.0..=1.0).contains(&wc.weight) {
                return Err(ValidationError::InvalidPreferences(format!(
                    "weight for '{}' must be between 0 and 1, got {}",
                    wc.category, wc.weight
                )));
            }
            if !seen.insert(wc.category) {
                return Err(ValidationError::InvalidPreferences(format!(
                    "category '{}' listed more than once",
                    wc.category
                )));
            }
        }

        Ok(Self {
            categories: self.categories,
            keywords: normalize_list("keywords", self.keywords)?,
            preferred_sources: normalize_list("preferred_sources", self.preferred_sources)?,
            sentiment_bias: self.sentiment_bias,
        })
    }
}

fn normalize_list(field: &str, values: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(values.len());

    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidPreferences(format!(
                "{field} must not contain blank entries"
            )));
        }
        if trimmed.chars().count() > MAX_ITEM_CHARS {
            return Err(ValidationError::InvalidPreferences(format!(
                "{field} entries must be at most {MAX_ITEM_CHARS} characters"
            )));
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_owned());
        }
    }

    if out.len() > MAX_LIST_ITEMS {
        return Err(ValidationError::InvalidPreferences(format!(
            "{field} accepts at most {MAX_LIST_ITEMS} entries"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> UserPreferences {
        UserPreferences {
            categories: vec![WeightedCategory {
                category: Category::Stock,
                weight: 0.7,
            }],
            keywords: vec![" Inflation ".to_string(), "inflation".to_string(), "FX".to_string()],
            preferred_sources: vec!["Reuters".to_string()],
            sentiment_bias: Some(SentimentBias::Balanced),
        }
    }

    #[test]
    fn normalized_trims_and_dedupes_keywords() {
        let out = prefs().normalized().expect("valid");
        assert_eq!(out.keywords, vec!["Inflation".to_string(), "FX".to_string()]);
        assert_eq!(out.preferred_sources, vec!["Reuters".to_string()]);
    }

    #[test]
    fn normalized_rejects_out_of_range_weight() {
        let mut p = prefs();
        p.categories[0].weight = 1.5;
        assert!(matches!(
            p.normalized(),
            Err(ValidationError::InvalidPreferences(_))
        ));
    }

    #[test]
    fn normalized_rejects_duplicate_categories() {
        let mut p = prefs();
        p.categories.push(WeightedCategory {
            category: Category::Stock,
            weight: 0.1,
        });
        assert!(p.normalized().is_err());
    }

    #[test]
    fn normalized_rejects_blank_and_too_many_entries() {
        let mut p = prefs();
        p.keywords = vec!["  ".to_string()];
        assert!(p.normalized().is_err());

        let mut p = prefs();
        p.preferred_sources = (0..21).map(|i| format!("source-{i}")).collect();
        assert!(p.normalized().is_err());
    }

    #[test]
    fn sentiment_bias_parses_known_values() {
        assert_eq!("balanced".parse::<SentimentBias>(), Ok(SentimentBias::Balanced));
        assert!("bullish".parse::<SentimentBias>().is_err());
    }
}
