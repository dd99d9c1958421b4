//! JSON file importers for generated articles and reports.
//!
//! Files are produced by the upstream analysis pipeline. Every importer is an
//! upsert, so re-running on the same file is safe.

use std::path::Path;

use anyhow::Context;
use econbrief_core::{ArticleRecord, DailyReportRecord, PersonalizedReportRecord};
use econbrief_db::UserProfile;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Articles file contents: a list, or one bare article.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ArticleBatch {
    Many(Vec<ArticleRecord>),
    One(Box<ArticleRecord>),
}

impl ArticleBatch {
    pub(crate) fn into_records(self) -> Vec<ArticleRecord> {
        match self {
            ArticleBatch::Many(records) => records,
            ArticleBatch::One(record) => vec![*record],
        }
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str, what: &str) -> anyhow::Result<T> {
    serde_json::from_str(raw).with_context(|| format!("invalid {what} JSON"))
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Upsert every article in `path`, deduplicating on link.
///
/// An article that fails to store is logged and skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if no article
/// could be stored.
pub(crate) async fn run_import_articles(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let records = parse_json::<ArticleBatch>(&read_file(path)?, "articles")?.into_records();
    let total = records.len();
    let mut stored = 0_usize;

    for record in &records {
        match econbrief_db::upsert_article(pool, record).await {
            Ok(id) => {
                stored += 1;
                tracing::debug!(id, link = %record.link, "article stored");
            }
            Err(e) => {
                tracing::warn!(link = %record.link, error = %e, "skipping article");
            }
        }
    }

    tracing::info!(total, stored, skipped = total - stored, "article import finished");
    if total > 0 && stored == 0 {
        anyhow::bail!("none of the {total} articles in {} were stored", path.display());
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the upsert fails.
pub(crate) async fn run_import_daily_report(
    pool: &sqlx::PgPool,
    path: &Path,
) -> anyhow::Result<()> {
    let record: DailyReportRecord = parse_json(&read_file(path)?, "daily report")?;
    let id = econbrief_db::upsert_daily_report(pool, &record).await?;
    tracing::info!(
        id,
        report_date = %record.report_date,
        article_count = record.article_count(),
        "daily report stored"
    );
    Ok(())
}

/// Store a personalized report for `external_id`, creating the user row if
/// identity sync has not mirrored it yet.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a database call
/// fails.
pub(crate) async fn run_import_personalized_report(
    pool: &sqlx::PgPool,
    external_id: &str,
    path: &Path,
) -> anyhow::Result<()> {
    let external_id = external_id.trim();
    if external_id.is_empty() {
        anyhow::bail!("--user must not be blank");
    }

    let record: PersonalizedReportRecord = parse_json(&read_file(path)?, "personalized report")?;
    let profile = UserProfile {
        external_id,
        ..UserProfile::default()
    };
    let user = econbrief_db::get_or_create_user(pool, &profile).await?;
    let id = econbrief_db::upsert_personalized_report(pool, user.id, &record).await?;

    tracing::info!(
        id,
        user_id = user.id,
        report_date = %record.report.report_date,
        "personalized report stored"
    );
    Ok(())
}
