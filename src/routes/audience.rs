use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use std::future::{ready, Ready};
use validator::Validate;

use crate::core::ValidationError;
use crate::models::{AudienceCountRequest, AudienceCountResponse, AudienceRequest};
use crate::routes::errors::ApiError;
use crate::routes::AppState;
use crate::services::{bearer_token, Principal, MANAGE_PANELISTS};

/// Configure admin audience routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/admin/audience", web::post().to(list_audience))
        .route("/admin/audience/count", web::post().to(count_audience));
}

/// Caller holding the `manage_panelists` capability.
///
/// Listed first among handler arguments so the capability check runs before
/// the body is decoded and before the store can be reached.
pub struct PanelManager(pub Principal);

impl FromRequest for PanelManager {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(req).map(PanelManager))
    }
}

fn authorize(req: &HttpRequest) -> Result<Principal, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state not configured".into()))?;

    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    Ok(state.auth.require(bearer_token(header), Some(MANAGE_PANELISTS))?)
}

/// List audience endpoint
///
/// POST /api/v1/admin/audience
///
/// Request body:
/// ```json
/// {
///   "filters": {
///     "program": "wave1",
///     "age_range": [18, 34],
///     "location": ["US-CA", "US-NY"],
///     "interests": ["sports", "music"]
///   },
///   "limit": 100,
///   "offset": 0
/// }
/// ```
async fn list_audience(
    PanelManager(principal): PanelManager,
    state: web::Data<AppState>,
    req: web::Json<AudienceRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate().map_err(ValidationError::from)?;

    tracing::info!(
        "Audience requested by {} for program {:?}",
        principal.user_id,
        req.filters.program
    );

    let result = state
        .engine
        .filter_audience(&req.filters, req.limit, req.offset)
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

/// Count audience endpoint
///
/// POST /api/v1/admin/audience/count
async fn count_audience(
    PanelManager(principal): PanelManager,
    state: web::Data<AppState>,
    req: web::Json<AudienceCountRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate().map_err(ValidationError::from)?;

    tracing::info!(
        "Audience count requested by {} for program {:?}",
        principal.user_id,
        req.filters.program
    );

    let total = state.engine.count_audience(&req.filters).await?;

    Ok(HttpResponse::Ok().json(AudienceCountResponse {
        program: req.filters.program.clone().unwrap_or_default(),
        total,
    }))
}
