use chrono::{DateTime, Utc};
use econbrief_core::{SentimentBias, UserPreferences, WeightedCategory};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PreferencesRow {
    pub user_id: i64,
    pub categories: Json<Vec<WeightedCategory>>,
    pub keywords: Vec<String>,
    pub preferred_sources: Vec<String>,
    pub sentiment_bias: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PreferencesRow {
    /// Convert back into the domain type. Unknown stored bias values are dropped.
    #[must_use]
    pub fn into_preferences(self) -> UserPreferences {
        UserPreferences {
            categories: self.categories.0,
            keywords: self.keywords,
            preferred_sources: self.preferred_sources,
            sentiment_bias: self
                .sentiment_bias
                .and_then(|b| b.parse::<SentimentBias>().ok()),
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_preferences(pool: &PgPool, user_id: i64) -> Result<Option<PreferencesRow>, DbError> {
    let row = sqlx::query_as::<_, PreferencesRow>(
        "SELECT user_id, categories, keywords, preferred_sources, sentiment_bias, updated_at \
         FROM user_preferences WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Replace `user_id`'s preferences, creating the row on first write.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_preferences(
    pool: &PgPool,
    user_id: i64,
    prefs: &UserPreferences,
) -> Result<PreferencesRow, DbError> {
    let row = sqlx::query_as::<_, PreferencesRow>(
        "INSERT INTO user_preferences \
           (user_id, categories, keywords, preferred_sources, sentiment_bias) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id) DO UPDATE SET \
           categories = EXCLUDED.categories, \
           keywords = EXCLUDED.keywords, \
           preferred_sources = EXCLUDED.preferred_sources, \
           sentiment_bias = EXCLUDED.sentiment_bias, \
           updated_at = NOW() \
         RETURNING user_id, categories, keywords, preferred_sources, sentiment_bias, updated_at",
    )
    .bind(user_id)
    .bind(Json(&prefs.categories))
    .bind(&prefs.keywords)
    .bind(&prefs.preferred_sources)
    .bind(prefs.sentiment_bias.map(SentimentBias::as_str))
    .fetch_one(pool)
    .await?;
    Ok(row)
}
