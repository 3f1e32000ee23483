use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::core::engine::{PageLimits, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::services::auth::MANAGE_PANELISTS;

/// Secret shipped in `config/default.toml`; never valid outside development
pub const DEV_JWT_SECRET: &str = "dev-only-change-me";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub rest: Option<RestSettings>,
    pub auth: AuthSettings,
    #[serde(default)]
    pub audience: AudienceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Which panelist store backs the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Rest,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// JSON fixture loaded by the memory backend
    pub fixture_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Managed backend REST endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RestSettings {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_rest_table")]
    pub table: String,
    pub timeout_secs: Option<u64>,
}

fn default_rest_table() -> String { "panelists".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub audience: Option<String>,
    /// Capabilities granted by each role claim
    #[serde(default = "default_role_grants")]
    pub roles: HashMap<String, Vec<String>>,
}

fn default_role_grants() -> HashMap<String, Vec<String>> {
    HashMap::from([("admin".to_string(), vec![MANAGE_PANELISTS.to_string()])])
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudienceSettings {
    #[serde(default = "default_page_limit")]
    pub default_limit: u32,
    #[serde(default = "max_page_limit")]
    pub max_limit: u32,
}

impl Default for AudienceSettings {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: max_page_limit(),
        }
    }
}

impl AudienceSettings {
    /// Page limits, with the default clamped into `1..=max_limit`
    pub fn page_limits(&self) -> PageLimits {
        let max_limit = self.max_limit.max(1);
        PageLimits {
            default_limit: self.default_limit.clamp(1, max_limit),
            max_limit,
        }
    }
}

fn default_page_limit() -> u32 { DEFAULT_PAGE_LIMIT }
fn max_page_limit() -> u32 { MAX_PAGE_LIMIT }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PANEL__)
    /// 5. DATABASE_URL, JWT_SECRET and REST_API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PANEL__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("PANEL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = EnvOverrides::from_env().apply(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PANEL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Refuse to serve real panel data behind the shipped development secret
    pub fn ensure_secure(&self) -> Result<(), ConfigError> {
        let secret = self.auth.jwt_secret.trim();
        let insecure = secret.is_empty() || secret == DEV_JWT_SECRET;
        if insecure && self.store.backend != StoreBackend::Memory {
            return Err(ConfigError::Message(format!(
                "auth.jwt_secret must be set (JWT_SECRET) for the {:?} store backend",
                self.store.backend
            )));
        }
        Ok(())
    }
}

/// Conventional unprefixed variables applied on top of the layered config
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub rest_api_key: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        use std::env;

        Self {
            database_url: env::var("DATABASE_URL").ok(),
            jwt_secret: env::var("JWT_SECRET").ok(),
            rest_api_key: env::var("REST_API_KEY").ok(),
        }
    }

    pub fn apply(self, settings: Config) -> Result<Config, ConfigError> {
        // A lone api_key would create a [rest] table without an endpoint
        let has_rest_endpoint = settings.get_string("rest.endpoint").is_ok();
        let mut builder = Config::builder().add_source(settings);

        if let Some(database_url) = self.database_url {
            builder = builder.set_override("database.url", database_url)?;
        }
        if let Some(secret) = self.jwt_secret {
            builder = builder.set_override("auth.jwt_secret", secret)?;
        }
        if let Some(api_key) = self.rest_api_key.filter(|_| has_rest_endpoint) {
            builder = builder.set_override("rest.api_key", api_key)?;
        }

        builder.build()
    }
}
