// Core algorithm exports
pub mod engine;
pub mod filters;
pub mod predicate;

pub use engine::{AudienceEngine, AudienceError, PageLimits};
pub use filters::{matches_criteria, validate_filters, ValidationError};
pub use predicate::{build_conditions, AudienceQuery, Column, Condition, Value};
