use serde::{Deserialize, Serialize};

/// Inclusive integer bounds, sent on the wire as `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange(pub i32, pub i32);

impl IntRange {
    pub fn min(&self) -> i32 {
        self.0
    }

    pub fn max(&self) -> i32 {
        self.1
    }

    #[inline]
    pub fn contains(&self, value: i32) -> bool {
        value >= self.0 && value <= self.1
    }
}

/// Panelist record as stored in the `panelists` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panelist {
    #[serde(alias = "panelistId")]
    pub panelist_id: String,
    pub program: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub income: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, alias = "educationLevel")]
    pub education_level: Option<String>,
    #[serde(default, alias = "employmentStatus")]
    pub employment_status: Option<String>,
    #[serde(default, alias = "householdSize")]
    pub household_size: Option<i32>,
    #[serde(default, alias = "childrenUnder18")]
    pub children_under_18: Option<bool>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Panelist {
    /// Summary view returned to admin callers
    pub fn summary(&self) -> AudienceMember {
        AudienceMember {
            panelist_id: self.panelist_id.clone(),
            program: self.program.clone(),
            gender: self.gender.clone(),
            age: self.age,
            location: self.location.clone(),
        }
    }
}

/// Validated audience filter.
///
/// Only constructed through [`crate::core::filters::validate_filters`], so every
/// range satisfies `min <= max` and `program` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub program: String,
    pub gender: Option<String>,
    pub age_range: Option<IntRange>,
    pub income_range: Option<IntRange>,
    pub location: Vec<String>,
    pub interests: Vec<String>,
    pub education_level: Option<String>,
    pub employment_status: Option<String>,
    pub household_size: Option<IntRange>,
    pub children_under_18: Option<bool>,
}

impl FilterCriteria {
    /// Criteria that select every panelist of a program
    pub fn for_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            gender: None,
            age_range: None,
            income_range: None,
            location: Vec::new(),
            interests: Vec::new(),
            education_level: None,
            employment_status: None,
            household_size: None,
            children_under_18: None,
        }
    }
}

/// Bounded window applied to every audience query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}

impl Page {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Zero-size page, used when only the total is wanted
    pub fn count_only() -> Self {
        Self { limit: 0, offset: 0 }
    }
}

/// Summary of a matching panelist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceMember {
    #[serde(alias = "panelistId")]
    pub panelist_id: String,
    pub program: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
}

/// One page of matches as returned by a store
#[derive(Debug, Clone, PartialEq)]
pub struct AudiencePage {
    pub members: Vec<AudienceMember>,
    pub total: u64,
}

/// Engine output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceResult {
    pub members: Vec<AudienceMember>,
    pub count: usize,
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
    pub next_offset: Option<u64>,
}

impl AudienceResult {
    pub fn from_page(page: AudiencePage, window: Page) -> Self {
        let count = page.members.len();
        let consumed = window.offset + count as u64;
        let next_offset = if count > 0 && consumed < page.total {
            Some(consumed)
        } else {
            None
        };

        Self {
            members: page.members,
            count,
            total: page.total,
            limit: window.limit,
            offset: window.offset,
            next_offset,
        }
    }
}
