use async_trait::async_trait;
use std::path::Path;

use crate::core::predicate::AudienceQuery;
use crate::models::{AudiencePage, Panelist};
use crate::services::store::{PanelistStore, StoreError};

/// Fixture-backed panelist store for local development and tests
///
/// Holds an immutable snapshot sorted by `panelist_id`, matching the order the
/// SQL backends page in.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPanelistStore {
    panelists: Vec<Panelist>,
}

impl InMemoryPanelistStore {
    pub fn new(mut panelists: Vec<Panelist>) -> Self {
        panelists.sort_by(|a, b| a.panelist_id.cmp(&b.panelist_id));
        Self { panelists }
    }

    /// Load a JSON array of panelists
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let panelists: Vec<Panelist> = serde_json::from_str(json)
            .map_err(|e| StoreError::Fixture(format!("Failed to parse panelists: {}", e)))?;
        Ok(Self::new(panelists))
    }

    /// Load a JSON fixture file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Fixture(format!("{}: {}", path.display(), e)))?;

        let store = Self::from_json(&json)?;
        tracing::info!("Loaded {} panelists from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.panelists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panelists.is_empty()
    }
}

#[async_trait]
impl PanelistStore for InMemoryPanelistStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn query_audience(&self, query: &AudienceQuery) -> Result<AudiencePage, StoreError> {
        let matched: Vec<&Panelist> = self
            .panelists
            .iter()
            .filter(|p| query.conditions.iter().all(|c| c.matches(p)))
            .collect();

        let offset = usize::try_from(query.page.offset).unwrap_or(usize::MAX);
        let members = matched
            .iter()
            .skip(offset)
            .take(query.page.limit as usize)
            .map(|p| p.summary())
            .collect();

        Ok(AudiencePage {
            members,
            total: matched.len() as u64,
        })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
