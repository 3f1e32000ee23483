//! Backend-neutral audience predicate.
//!
//! A filter is compiled into a conjunction of [`Condition`]s over the fixed set
//! of panelist [`Column`]s. Each store renders the same list natively: SQL for
//! Postgres, query operators for the REST backend, direct evaluation in memory.

use crate::models::{FilterCriteria, Page, Panelist};

/// Filterable panelist columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Program,
    Gender,
    Age,
    Income,
    Location,
    Interests,
    EducationLevel,
    EmploymentStatus,
    HouseholdSize,
    ChildrenUnder18,
}

impl Column {
    /// Column name in the `panelists` table
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Program => "program",
            Column::Gender => "gender",
            Column::Age => "age",
            Column::Income => "income",
            Column::Location => "location",
            Column::Interests => "interests",
            Column::EducationLevel => "education_level",
            Column::EmploymentStatus => "employment_status",
            Column::HouseholdSize => "household_size",
            Column::ChildrenUnder18 => "children_under_18",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Bool(bool),
}

/// One conjunct of the audience predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `column = value`
    Equals { column: Column, value: Value },
    /// `min <= column <= max`
    Between { column: Column, min: i32, max: i32 },
    /// column value is one of `values`
    InSet { column: Column, values: Vec<String> },
    /// set-valued column shares at least one element with `values`
    Overlaps { column: Column, values: Vec<String> },
}

impl Condition {
    pub fn column(&self) -> Column {
        match self {
            Condition::Equals { column, .. }
            | Condition::Between { column, .. }
            | Condition::InSet { column, .. }
            | Condition::Overlaps { column, .. } => *column,
        }
    }

    /// Evaluate against a single panelist. Absent column values never match.
    pub fn matches(&self, panelist: &Panelist) -> bool {
        match self {
            Condition::Equals {
                column,
                value: Value::Text(expected),
            } => text_field(panelist, *column) == Some(expected.as_str()),
            Condition::Equals {
                column,
                value: Value::Bool(expected),
            } => bool_field(panelist, *column) == Some(*expected),
            Condition::Between { column, min, max } => {
                int_field(panelist, *column).is_some_and(|v| v >= *min && v <= *max)
            }
            Condition::InSet { column, values } => text_field(panelist, *column)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            Condition::Overlaps { column, values } => set_field(panelist, *column)
                .iter()
                .any(|v| values.contains(v)),
        }
    }
}

fn text_field(panelist: &Panelist, column: Column) -> Option<&str> {
    match column {
        Column::Program => Some(panelist.program.as_str()),
        Column::Gender => panelist.gender.as_deref(),
        Column::Location => panelist.location.as_deref(),
        Column::EducationLevel => panelist.education_level.as_deref(),
        Column::EmploymentStatus => panelist.employment_status.as_deref(),
        _ => None,
    }
}

fn int_field(panelist: &Panelist, column: Column) -> Option<i32> {
    match column {
        Column::Age => panelist.age,
        Column::Income => panelist.income,
        Column::HouseholdSize => panelist.household_size,
        _ => None,
    }
}

fn bool_field(panelist: &Panelist, column: Column) -> Option<bool> {
    match column {
        Column::ChildrenUnder18 => panelist.children_under_18,
        _ => None,
    }
}

fn set_field(panelist: &Panelist, column: Column) -> &[String] {
    match column {
        Column::Interests => &panelist.interests,
        _ => &[],
    }
}

/// Composed read issued to a store: predicate plus page window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceQuery {
    pub conditions: Vec<Condition>,
    pub page: Page,
}

impl AudienceQuery {
    pub fn new(criteria: &FilterCriteria, page: Page) -> Self {
        Self {
            conditions: build_conditions(criteria),
            page,
        }
    }
}

/// Compile validated criteria into a conjunction of conditions.
///
/// The program equality always comes first; empty sets add nothing.
pub fn build_conditions(criteria: &FilterCriteria) -> Vec<Condition> {
    let mut conditions = vec![Condition::Equals {
        column: Column::Program,
        value: Value::Text(criteria.program.clone()),
    }];

    let scalars = [
        (Column::Gender, &criteria.gender),
        (Column::EducationLevel, &criteria.education_level),
        (Column::EmploymentStatus, &criteria.employment_status),
    ];
    for (column, value) in scalars {
        if let Some(v) = value {
            conditions.push(Condition::Equals {
                column,
                value: Value::Text(v.clone()),
            });
        }
    }

    if let Some(flag) = criteria.children_under_18 {
        conditions.push(Condition::Equals {
            column: Column::ChildrenUnder18,
            value: Value::Bool(flag),
        });
    }

    let ranges = [
        (Column::Age, criteria.age_range),
        (Column::Income, criteria.income_range),
        (Column::HouseholdSize, criteria.household_size),
    ];
    for (column, range) in ranges {
        if let Some(r) = range {
            conditions.push(Condition::Between {
                column,
                min: r.min(),
                max: r.max(),
            });
        }
    }

    if !criteria.location.is_empty() {
        conditions.push(Condition::InSet {
            column: Column::Location,
            values: criteria.location.clone(),
        });
    }

    if !criteria.interests.is_empty() {
        conditions.push(Condition::Overlaps {
            column: Column::Interests,
            values: criteria.interests.clone(),
        });
    }

    conditions
}
