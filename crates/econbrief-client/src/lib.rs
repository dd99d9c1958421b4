//! Reader-side client for the econbrief API: typed HTTP calls, a keyed
//! query cache, "load more" feeds, and optimistic bookmark toggling.

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod feed;
pub mod http;
pub mod types;

pub use cache::{QueryCache, QueryKey};
pub use coordinator::{BookmarkApi, BookmarkCoordinator, BookmarkState};
pub use error::ClientError;
pub use feed::Feed;
pub use http::ApiClient;
pub use types::{
    Article, ArticleQuery, BookmarkedArticle, DailyReport, Identity, PageResponse,
    PersonalizedReport,
};
