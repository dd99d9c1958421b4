//! Users mirrored from the auth provider, keyed by `external_id`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields as reported by the auth provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserProfile<'a> {
    pub external_id: &'a str,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

/// Return the user for `profile.external_id`, creating a placeholder row first
/// if identity sync has not mirrored it yet.
///
/// Existing profile fields are never overwritten; only blanks are filled in.
/// Safe to race: the unique `external_id` constraint resolves concurrent
/// creates to a single row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn get_or_create_user(pool: &PgPool, profile: &UserProfile<'_>) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (external_id, email, name, avatar_url) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (external_id) DO UPDATE SET \
           email = COALESCE(users.email, EXCLUDED.email), \
           name = COALESCE(users.name, EXCLUDED.name), \
           avatar_url = COALESCE(users.avatar_url, EXCLUDED.avatar_url) \
         RETURNING id, external_id, email, name, avatar_url, created_at, updated_at",
    )
    .bind(profile.external_id)
    .bind(profile.email)
    .bind(profile.name)
    .bind(profile.avatar_url)
    .fetch_one(pool)
    .await?;

    tracing::debug!(user_id = row.id, external_id = %row.external_id, "resolved user");
    Ok(row)
}

/// Mirror a created/updated identity into `users`, overwriting profile fields.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_user_profile(pool: &PgPool, profile: &UserProfile<'_>) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (external_id, email, name, avatar_url) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (external_id) DO UPDATE SET \
           email = EXCLUDED.email, \
           name = EXCLUDED.name, \
           avatar_url = EXCLUDED.avatar_url, \
           updated_at = NOW() \
         RETURNING id, external_id, email, name, avatar_url, created_at, updated_at",
    )
    .bind(profile.external_id)
    .bind(profile.email)
    .bind(profile.name)
    .bind(profile.avatar_url)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Look up a user without creating one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, external_id, email, name, avatar_url, created_at, updated_at \
         FROM users WHERE external_id = $1",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Delete a mirrored user. Bookmarks, preferences and personalized reports go
/// with it. Returns `false` if no such user existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_user_by_external_id(pool: &PgPool, external_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM users WHERE external_id = $1")
        .bind(external_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
