// Route exports
pub mod audience;
pub mod errors;
pub mod health;

use actix_web::web;
use std::sync::Arc;

use crate::core::AudienceEngine;
use crate::services::AuthGate;

pub use errors::{handle_json_payload_error, handle_query_payload_error, ApiError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: AudienceEngine,
    pub auth: Arc<AuthGate>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(audience::configure),
    );
}
