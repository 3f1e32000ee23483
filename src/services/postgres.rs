use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::core::predicate::{AudienceQuery, Condition, Value};
use crate::models::{AudienceMember, AudiencePage, Panelist};
use crate::services::store::{PanelistStore, StoreError};

/// Columns returned for each audience member
const MEMBER_COLUMNS: &str = "panelist_id, program, gender, age, location";

/// PostgreSQL-backed panelist store
///
/// Renders the audience predicate as a single statement that returns both the
/// match total and the requested page, so every call is one round trip.
pub struct PostgresPanelistStore {
    pool: PgPool,
}

impl PostgresPanelistStore {
    /// Create a new store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let max_connections = settings.max_connections.unwrap_or(10);
        tracing::info!(max_connections, "Connecting to PostgreSQL");

        Self::new(
            &settings.url,
            max_connections,
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Insert or replace a panelist record
    pub async fn upsert_panelist(&self, panelist: &Panelist) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO panelists (
                panelist_id, program, gender, age, income, location, interests,
                education_level, employment_status, household_size, children_under_18
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (panelist_id)
            DO UPDATE SET
                program = EXCLUDED.program,
                gender = EXCLUDED.gender,
                age = EXCLUDED.age,
                income = EXCLUDED.income,
                location = EXCLUDED.location,
                interests = EXCLUDED.interests,
                education_level = EXCLUDED.education_level,
                employment_status = EXCLUDED.employment_status,
                household_size = EXCLUDED.household_size,
                children_under_18 = EXCLUDED.children_under_18
        "#;

        sqlx::query(query)
            .bind(&panelist.panelist_id)
            .bind(&panelist.program)
            .bind(&panelist.gender)
            .bind(panelist.age)
            .bind(panelist.income)
            .bind(&panelist.location)
            .bind(&panelist.interests)
            .bind(&panelist.education_level)
            .bind(&panelist.employment_status)
            .bind(panelist.household_size)
            .bind(panelist.children_under_18)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Build the composed audience statement.
///
/// Column names come from [`crate::core::predicate::Column`] only; every
/// user-supplied value is a bind parameter.
pub fn build_audience_sql(query: &AudienceQuery) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new("WITH matched AS (SELECT ");
    builder.push(MEMBER_COLUMNS);
    builder.push(" FROM panelists WHERE ");

    for (i, condition) in query.conditions.iter().enumerate() {
        if i > 0 {
            builder.push(" AND ");
        }
        push_condition(&mut builder, condition);
    }

    builder.push(
        ") SELECT (SELECT COUNT(*) FROM matched) AS total, \
         COALESCE((SELECT json_agg(page ORDER BY page.panelist_id) FROM \
         (SELECT * FROM matched ORDER BY panelist_id LIMIT ",
    );
    builder.push_bind(i64::from(query.page.limit));
    builder.push(" OFFSET ");
    builder.push_bind(i64::try_from(query.page.offset).unwrap_or(i64::MAX));
    builder.push(") AS page), '[]'::json) AS members");

    builder
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, condition: &Condition) {
    let column = condition.column().as_str();
    match condition {
        Condition::Equals {
            value: Value::Text(v),
            ..
        } => {
            builder.push(column).push(" = ").push_bind(v.clone());
        }
        Condition::Equals {
            value: Value::Bool(v),
            ..
        } => {
            builder.push(column).push(" = ").push_bind(*v);
        }
        Condition::Between { min, max, .. } => {
            builder
                .push(column)
                .push(" BETWEEN ")
                .push_bind(*min)
                .push(" AND ")
                .push_bind(*max);
        }
        Condition::InSet { values, .. } => {
            builder
                .push(column)
                .push(" = ANY(")
                .push_bind(values.clone())
                .push(")");
        }
        Condition::Overlaps { values, .. } => {
            builder.push(column).push(" && ").push_bind(values.clone());
        }
    }
}

#[async_trait]
impl PanelistStore for PostgresPanelistStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn query_audience(&self, query: &AudienceQuery) -> Result<AudiencePage, StoreError> {
        let mut builder = build_audience_sql(query);
        let row = builder.build().fetch_one(&self.pool).await?;

        let total: i64 = row.try_get("total")?;
        let Json(members): Json<Vec<AudienceMember>> = row.try_get("members")?;

        tracing::debug!(
            total,
            returned = members.len(),
            "Audience query completed"
        );

        Ok(AudiencePage {
            members,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
