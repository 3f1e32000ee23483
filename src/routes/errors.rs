use actix_web::http::StatusCode;
use actix_web::{error, HttpRequest, HttpResponse, ResponseError};
use thiserror::Error;

use crate::core::{AudienceError, ValidationError};
use crate::models::ErrorResponse;
use crate::services::{AuthError, StoreError};

/// Errors surfaced by HTTP handlers.
///
/// This is the only place errors become responses: validation messages are
/// passed through, auth failures carry no reason, store and internal failures
/// are logged under an incident id and answered generically.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{message}")]
    BadPayload { error: &'static str, message: String },
}

impl From<AudienceError> for ApiError {
    fn from(err: AudienceError) -> Self {
        match err {
            AudienceError::Validation(e) => ApiError::Validation(e),
            AudienceError::Store(e) => ApiError::Store(e),
        }
    }
}

impl ApiError {
    fn body(&self, incident_id: Option<String>) -> ErrorResponse {
        let (error, message) = match self {
            ApiError::Validation(e) => ("validation_failed", e.to_string()),
            ApiError::BadPayload { error, message } => (*error, message.clone()),
            ApiError::Unauthorized(_) => ("unauthorized", "Authentication required".to_string()),
            ApiError::Store(_) | ApiError::Internal(_) => {
                ("internal_error", "An unexpected error occurred".to_string())
            }
        };

        ErrorResponse {
            error: error.to_string(),
            message,
            status_code: self.status_code().as_u16(),
            incident_id,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadPayload { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let incident_id = match self {
            ApiError::Store(_) | ApiError::Internal(_) => {
                let id = uuid::Uuid::new_v4().to_string();
                tracing::error!(incident_id = %id, "Request failed: {}", self);
                Some(id)
            }
            ApiError::Unauthorized(reason) => {
                tracing::debug!("Rejected caller: {}", reason);
                None
            }
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(self.body(incident_id))
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::BadPayload {
        error: "invalid_json",
        message: format!("Invalid JSON: {}", err),
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadPayload {
        error: "invalid_query",
        message: format!("Invalid query: {}", err),
    }
    .into()
}
