use std::sync::Arc;

use thiserror::Error;

use crate::core::filters::{validate_filters, ValidationError};
use crate::core::predicate::AudienceQuery;
use crate::models::{AudienceResult, FilterInput, Page};
use crate::services::store::{PanelistStore, StoreError};

/// Default page size when the caller sends none
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Largest page a caller may request
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Errors returned by the audience engine
#[derive(Debug, Error)]
pub enum AudienceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Page bounds applied to every audience query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl PageLimits {
    /// Resolve a caller's page request, falling back to the default size
    pub fn resolve(&self, limit: Option<u32>, offset: Option<u64>) -> Result<Page, ValidationError> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 || limit > self.max_limit {
            return Err(ValidationError::LimitOutOfBounds {
                limit,
                max: self.max_limit,
            });
        }
        Ok(Page::new(limit, offset.unwrap_or(0)))
    }
}

/// Audience filter engine
///
/// Stateless apart from the shared store handle; each call validates the
/// filter, compiles it into one [`AudienceQuery`] and issues it once. Store
/// errors and timeouts are returned unchanged and never retried.
#[derive(Clone)]
pub struct AudienceEngine {
    store: Arc<dyn PanelistStore>,
    limits: PageLimits,
}

impl AudienceEngine {
    pub fn new(store: Arc<dyn PanelistStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &dyn PanelistStore {
        self.store.as_ref()
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// List the panelists matching `filters`, one page at a time
    pub async fn filter_audience(
        &self,
        filters: &FilterInput,
        limit: Option<u32>,
        offset: Option<u64>,
    ) -> Result<AudienceResult, AudienceError> {
        let criteria = validate_filters(filters)?;
        let page = self.limits.resolve(limit, offset)?;
        let query = AudienceQuery::new(&criteria, page);

        tracing::debug!(
            program = %criteria.program,
            conditions = query.conditions.len(),
            limit = page.limit,
            offset = page.offset,
            "Filtering audience"
        );

        let found = self.store.query_audience(&query).await?;
        let result = AudienceResult::from_page(found, page);

        tracing::info!(
            "Audience for program {} returned {} of {} panelists",
            criteria.program,
            result.count,
            result.total
        );

        Ok(result)
    }

    /// Count the panelists matching `filters` without listing them
    pub async fn count_audience(&self, filters: &FilterInput) -> Result<u64, AudienceError> {
        let criteria = validate_filters(filters)?;
        let query = AudienceQuery::new(&criteria, Page::count_only());

        let found = self.store.query_audience(&query).await?;

        tracing::info!(
            "Audience for program {} counted {} panelists",
            criteria.program,
            found.total
        );

        Ok(found.total)
    }
}
