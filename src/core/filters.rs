use std::collections::HashSet;

use thiserror::Error;

use crate::core::predicate::build_conditions;
use crate::models::{FilterCriteria, FilterInput, IntRange, Panelist};

/// Malformed or incomplete audience filter input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("program is required")]
    MissingProgram,

    #[error("{field} is inverted: min {min} is greater than max {max}")]
    InvertedRange {
        field: &'static str,
        min: i32,
        max: i32,
    },

    #[error("limit must be between 1 and {max}, got {limit}")]
    LimitOutOfBounds { limit: u32, max: u32 },

    #[error("{0}")]
    Invalid(String),
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ValidationError::Invalid(errors.to_string())
    }
}

/// Turn raw filter input into validated criteria.
///
/// Runs before any store access; nothing is queried when this fails.
pub fn validate_filters(input: &FilterInput) -> Result<FilterCriteria, ValidationError> {
    let program = input
        .program
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(ValidationError::MissingProgram)?;

    check_range("age_range", input.age_range)?;
    check_range("income_range", input.income_range)?;
    check_range("household_size", input.household_size)?;

    Ok(FilterCriteria {
        program: program.to_string(),
        gender: non_blank(&input.gender),
        age_range: input.age_range,
        income_range: input.income_range,
        location: distinct_values(input.location.as_deref()),
        interests: distinct_values(input.interests.as_deref()),
        education_level: non_blank(&input.education_level),
        employment_status: non_blank(&input.employment_status),
        household_size: input.household_size,
        children_under_18: input.children_under_18,
    })
}

fn check_range(field: &'static str, range: Option<IntRange>) -> Result<(), ValidationError> {
    match range {
        Some(r) if r.min() > r.max() => Err(ValidationError::InvertedRange {
            field,
            min: r.min(),
            max: r.max(),
        }),
        _ => Ok(()),
    }
}

// Blank categorical values impose no constraint.
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn distinct_values(values: Option<&[String]>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .unwrap_or_default()
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Check a single panelist against validated criteria
#[inline]
pub fn matches_criteria(panelist: &Panelist, criteria: &FilterCriteria) -> bool {
    build_conditions(criteria)
        .iter()
        .all(|condition| condition.matches(panelist))
}
