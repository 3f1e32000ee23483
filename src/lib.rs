//! Panel Audience - audience filtering service for the panel rewards platform
//!
//! Administrators describe a target audience (program, demographics,
//! interests, household attributes); the engine compiles it into a single
//! conjunctive query against the panelist store and returns the matching page
//! plus counts.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{AudienceEngine, AudienceError, PageLimits, ValidationError};
pub use models::{AudienceRequest, AudienceResult, FilterCriteria, FilterInput, Panelist};
pub use services::{AuthGate, InMemoryPanelistStore, PanelistStore, StoreError};
