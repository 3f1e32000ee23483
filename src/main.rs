use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use panel_audience::config::{Settings, StoreBackend, DEV_JWT_SECRET};
use panel_audience::core::AudienceEngine;
use panel_audience::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use panel_audience::services::{
    AuthGate, InMemoryPanelistStore, PanelistStore, PostgresPanelistStore, RestPanelistStore, StoreError,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn build_store(settings: &Settings) -> Result<Arc<dyn PanelistStore>, StoreError> {
    let store: Arc<dyn PanelistStore> = match settings.store.backend {
        StoreBackend::Postgres => Arc::new(PostgresPanelistStore::from_settings(&settings.database).await?),
        StoreBackend::Rest => {
            let rest = settings
                .rest
                .as_ref()
                .ok_or_else(|| StoreError::Backend("store.backend = \"rest\" requires a [rest] section".into()))?;
            Arc::new(RestPanelistStore::from_settings(rest)?)
        }
        StoreBackend::Memory => match &settings.store.fixture_path {
            Some(path) => Arc::new(InMemoryPanelistStore::from_file(path)?),
            None => Arc::new(InMemoryPanelistStore::default()),
        },
    };

    Ok(store)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    // LOG_LEVEL / LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());
    init_logging(&log_level, &log_format);

    info!("Starting panel audience service...");

    settings.ensure_secure().map_err(|e| {
        error!("Refusing to start: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    if settings.auth.jwt_secret == DEV_JWT_SECRET {
        warn!("Using the development JWT secret with the in-memory store");
    }

    let store = build_store(&settings).await.map_err(|e| {
        error!("Failed to initialize {:?} store: {}", settings.store.backend, e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("Panelist store initialized ({})", store.name());

    let limits = settings.audience.page_limits();
    let engine = AudienceEngine::new(store, limits);

    info!(
        "Audience engine initialized (default limit: {}, max limit: {})",
        limits.default_limit, limits.max_limit
    );

    // Build application state
    let app_state = AppState {
        engine,
        auth: Arc::new(AuthGate::from_settings(&settings.auth)),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
