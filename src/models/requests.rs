use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::IntRange;

/// Audience filter as received from the admin console.
///
/// `program` is optional and unchecked here so a missing, empty or blank
/// program all surface as the same validation error from the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FilterInput {
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, alias = "ageRange")]
    pub age_range: Option<IntRange>,
    #[serde(default, alias = "incomeRange")]
    pub income_range: Option<IntRange>,
    #[validate(length(max = 500, message = "too many locations"))]
    #[serde(default)]
    pub location: Option<Vec<String>>,
    #[validate(length(max = 500, message = "too many interests"))]
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default, alias = "educationLevel")]
    pub education_level: Option<String>,
    #[serde(default, alias = "employmentStatus")]
    pub employment_status: Option<String>,
    #[serde(default, alias = "householdSize")]
    pub household_size: Option<IntRange>,
    #[serde(default, alias = "childrenUnder18")]
    pub children_under_18: Option<bool>,
}

/// Request to list a filtered audience
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AudienceRequest {
    #[validate(nested)]
    pub filters: FilterInput,
    #[validate(range(min = 1, message = "limit must be at least 1"))]
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Request to size an audience without listing it
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AudienceCountRequest {
    #[validate(nested)]
    pub filters: FilterInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_camel_case_aliases() {
        let body = r#"{
            "filters": {
                "program": "wave1",
                "ageRange": [18, 34],
                "childrenUnder18": true
            }
        }"#;
        let req: AudienceRequest = serde_json::from_str(body).unwrap();

        assert_eq!(req.filters.age_range, Some(IntRange(18, 34)));
        assert_eq!(req.filters.children_under_18, Some(true));
        assert!(req.limit.is_none());
    }

    #[test]
    fn test_missing_program_still_decodes() {
        let req: AudienceRequest = serde_json::from_str(r#"{"filters": {}}"#).unwrap();
        assert!(req.filters.program.is_none());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let req = AudienceRequest {
            filters: FilterInput {
                program: Some("wave1".to_string()),
                ..Default::default()
            },
            limit: Some(0),
            offset: None,
        };

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_program_left_to_core() {
        let req = AudienceCountRequest {
            filters: FilterInput {
                program: Some(String::new()),
                ..Default::default()
            },
        };

        assert!(req.validate().is_ok());
        assert_eq!(
            crate::core::validate_filters(&req.filters),
            Err(crate::core::ValidationError::MissingProgram)
        );
    }
}
