use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Input rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed cursor: {0}")]
    InvalidCursor(String),

    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(i64),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid preferences: {0}")]
    InvalidPreferences(String),
}
