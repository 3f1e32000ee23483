use async_trait::async_trait;
use thiserror::Error;

use crate::core::predicate::AudienceQuery;
use crate::models::AudiencePage;

/// Errors raised by a panelist store.
///
/// These are never retried by the engine and reach the HTTP boundary unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Sqlx(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("Store timed out: {0}")]
    Timeout(String),

    #[error("Backend returned error: {0}")]
    Backend(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

// Pool timeouts stay distinguishable from query failures.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout("connection pool acquire".into()),
            other => StoreError::Sqlx(other),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else {
            StoreError::Http(err)
        }
    }
}

/// Queryable table of panelist records.
///
/// Implementations issue exactly one read per `query_audience` call and do
/// not filter results client-side.
#[async_trait]
pub trait PanelistStore: Send + Sync {
    /// Short backend name used in logs and health output
    fn name(&self) -> &'static str;

    /// Run the composed predicate and return one page plus the match total
    async fn query_audience(&self, query: &AudienceQuery) -> Result<AudiencePage, StoreError>;

    /// Health check for the backing store
    async fn health_check(&self) -> Result<bool, StoreError>;
}
