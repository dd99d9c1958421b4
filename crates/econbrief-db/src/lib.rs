//! Postgres access for econbrief: pool setup, migrations, and one module of
//! query functions per table.

pub mod articles;
pub mod bookmarks;
pub mod daily_reports;
pub mod personalized_reports;
pub mod preferences;
pub mod users;

pub use articles::{
    count_articles, fetch_articles_page, get_article, resolve_articles, upsert_article, ArticleRow,
};
pub use bookmarks::{
    bookmarked_article_ids, fetch_bookmarked_articles_page, is_bookmarked, toggle_bookmark,
    BookmarkedArticleRow,
};
pub use daily_reports::{
    fetch_daily_reports_page, get_daily_report_by_date, get_latest_daily_report,
    upsert_daily_report, DailyReportRow,
};
pub use personalized_reports::{
    fetch_personalized_reports_page, get_personalized_report_by_date,
    upsert_personalized_report, PersonalizedReportRow,
};
pub use preferences::{get_preferences, upsert_preferences, PreferencesRow};
pub use users::{
    delete_user_by_external_id, get_or_create_user, get_user_by_external_id, upsert_user_profile,
    UserProfile, UserRow,
};

use std::time::Duration;

use econbrief_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

// Relative to this crate's manifest: the workspace-level `migrations/` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Error)]
pub enum DbError {
    /// A write referenced a row that does not exist.
    #[error("referenced row does not exist")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    #[must_use]
    pub fn has_sqlstate(&self, code: &str) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err.code().as_deref() == Some(code),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }

    fn options(self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(self.acquire_timeout)
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    let pool = config.options().connect(database_url).await?;
    tracing::debug!(
        max_connections = config.max_connections,
        "database pool connected"
    );
    Ok(pool)
}

/// Apply every pending migration and return how many were pending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the applied versions cannot be read, or
/// [`DbError::Migration`] if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let applied = applied_migration_versions(pool).await?;
    let pending = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count();

    MIGRATOR.run(pool).await?;
    Ok(pending)
}

/// Versions recorded as applied. A database that has never been migrated has
/// no `_sqlx_migrations` table, which reads as an empty list.
async fn applied_migration_versions(pool: &PgPool) -> Result<Vec<i64>, DbError> {
    let result = sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await
        .map_err(DbError::from);
    match result {
        Err(e) if e.has_sqlstate(UNDEFINED_TABLE) => Ok(Vec::new()),
        other => other,
    }
}

/// Round-trip a trivial query to prove the pool can reach the database.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_connections_never_exceed_max() {
        let config = PoolConfig {
            max_connections: 2,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(1),
        };
        let options = config.options();
        assert_eq!(options.get_min_connections(), 2);
        assert_eq!(options.get_max_connections(), 2);
    }

    #[test]
    fn not_found_has_no_sqlstate() {
        assert!(!DbError::NotFound.has_sqlstate(FOREIGN_KEY_VIOLATION));
    }

    #[sqlx::test(migrations = false)]
    async fn unmigrated_database_counts_every_migration_pending(pool: PgPool) {
        assert!(applied_migration_versions(&pool)
            .await
            .expect("missing table reads as empty")
            .is_empty());

        let expected = MIGRATOR
            .iter()
            .filter(|m| !m.migration_type.is_down_migration())
            .count();
        assert_eq!(run_migrations(&pool).await.expect("migrate"), expected);
        assert_eq!(run_migrations(&pool).await.expect("rerun"), 0);
    }

    #[sqlx::test(migrations = false)]
    async fn version_lookup_surfaces_other_failures(pool: PgPool) {
        pool.close().await;
        let err = applied_migration_versions(&pool)
            .await
            .expect_err("closed pool must fail");
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::PoolClosed)), "got: {err:?}");
    }
}
