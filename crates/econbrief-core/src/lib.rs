pub mod app_config;
pub mod articles;
pub mod config;
pub mod error;
pub mod pagination;
pub mod preferences;
pub mod reports;

pub use app_config::{AppConfig, Environment};
pub use articles::{ArticleFilters, ArticleRecord, Category, Region, Sentiment};
pub use config::load_app_config;
pub use error::{ConfigError, ValidationError};
pub use pagination::{resolve_limit, Cursor, Keyset, Page, SortKey, MAX_PAGE_LIMIT};
pub use preferences::{SentimentBias, UserPreferences, WeightedCategory};
pub use reports::{DailyReportRecord, PersonalizedReportRecord, PreferenceSnapshot};
