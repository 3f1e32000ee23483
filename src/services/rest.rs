use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::config::RestSettings;
use crate::core::predicate::{AudienceQuery, Condition, Value};
use crate::models::{AudienceMember, AudiencePage};
use crate::services::store::{PanelistStore, StoreError};

/// Columns requested for each audience member
const MEMBER_SELECT: &str = "panelist_id,program,gender,age,location";

/// Panelist store backed by the managed backend's REST interface
///
/// Speaks the PostgREST query dialect: one GET per audience query with the
/// predicate encoded as column operators, the total read from `Content-Range`.
pub struct RestPanelistStore {
    base_url: String,
    api_key: String,
    table: String,
    client: Client,
}

impl RestPanelistStore {
    /// Create a new REST store
    pub fn new(
        base_url: String,
        api_key: String,
        table: String,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            table,
            client,
        })
    }

    pub fn from_settings(settings: &RestSettings) -> Result<Self, StoreError> {
        Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.table.clone(),
            Duration::from_secs(settings.timeout_secs.unwrap_or(30)),
        )
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), self.table)
    }
}

/// Encode the predicate and page window as query parameters
pub fn build_query_params(query: &AudienceQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), MEMBER_SELECT.to_string())];

    for condition in &query.conditions {
        let column = condition.column().as_str().to_string();
        match condition {
            Condition::Equals {
                value: Value::Text(v),
                ..
            } => params.push((column, format!("eq.{}", v))),
            Condition::Equals {
                value: Value::Bool(v),
                ..
            } => params.push((column, format!("is.{}", v))),
            Condition::Between { min, max, .. } => {
                params.push((column.clone(), format!("gte.{}", min)));
                params.push((column, format!("lte.{}", max)));
            }
            Condition::InSet { values, .. } => {
                params.push((column, format!("in.({})", quote_list(values))));
            }
            Condition::Overlaps { values, .. } => {
                params.push((column, format!("ov.{{{}}}", quote_list(values))));
            }
        }
    }

    params.push(("order".to_string(), "panelist_id.asc".to_string()));
    params.push(("limit".to_string(), query.page.limit.to_string()));
    params.push(("offset".to_string(), query.page.offset.to_string()));
    params
}

fn quote_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse the total out of a `Content-Range` header such as `0-24/3573` or `*/0`
pub fn parse_total(content_range: &str) -> Option<u64> {
    content_range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

fn total_from_headers(headers: &HeaderMap) -> Result<u64, StoreError> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_total)
        .ok_or_else(|| StoreError::InvalidResponse("Missing or unbounded Content-Range".into()))
}

#[async_trait]
impl PanelistStore for RestPanelistStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn query_audience(&self, query: &AudienceQuery) -> Result<AudiencePage, StoreError> {
        let params = build_query_params(query);
        let url = format!("{}?{}", self.table_url(), encode_params(&params));

        tracing::debug!(
            table = %self.table,
            conditions = query.conditions.len(),
            limit = query.page.limit,
            offset = query.page.offset,
            "Querying audience"
        );

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let status = response.status();

        // Offset past the last match: empty page, total still reported
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            let total = total_from_headers(response.headers())?;
            return Ok(AudiencePage {
                members: Vec::new(),
                total,
            });
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Audience query failed: {} - {}", status, body);
            return Err(StoreError::Backend(format!(
                "Failed to query audience: {}",
                status
            )));
        }

        let total = total_from_headers(response.headers())?;

        let members: Vec<AudienceMember> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse members: {}", e)))?;

        tracing::debug!("Queried {} members (total: {})", members.len(), total);

        Ok(AudiencePage { members, total })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let url = format!("{}?select=panelist_id&limit=1", self.table_url());
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}
