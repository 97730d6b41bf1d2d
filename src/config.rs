//! Environment-driven configuration
//!
//! Recognized variables (a `.env` file is honored when present):
//! - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_ENCRYPT`
//! - `HOST`, `PORT`, `CORS_ORIGINS`
//! - `ENVIRONMENT` ("production" tightens TLS certificate trust and strips
//!   error detail from responses)

use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::http_server::config::HttpServerConfig;

/// Per-statement timeout applied to every pooled session, in milliseconds
const STATEMENT_TIMEOUT_MS: &str = "30000";

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_name() -> String {
    "postgres".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Whether to require TLS on the wire
    pub encrypt: bool,
    /// Accept the server certificate without verification (non-production)
    pub trust_server_certificate: bool,
    /// Timeout for acquiring a connection from the pool, in seconds
    pub connect_timeout_secs: u64,
    /// Upper bound on concurrently checked-out connections
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            database: default_db_name(),
            encrypt: false,
            trust_server_certificate: true,
            connect_timeout_secs: 30,
            max_connections: 10,
        }
    }
}

impl DbConfig {
    /// Driver connect options for this configuration
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if !self.encrypt {
            PgSslMode::Prefer
        } else if self.trust_server_certificate {
            // TLS on the wire, server certificate taken on trust
            PgSslMode::Require
        } else {
            PgSslMode::VerifyFull
        };

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database)
            .ssl_mode(ssl_mode)
            .options([("statement_timeout", STATEMENT_TIMEOUT_MS)]);

        if !self.password.is_empty() {
            options = options.password(&self.password);
        }

        options
    }

    /// View of the configuration safe to expose over diagnostics
    pub fn masked(&self) -> MaskedDbConfig {
        MaskedDbConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: "********".to_string(),
            database: self.database.clone(),
            encrypt: self.encrypt,
        }
    }
}

/// Database configuration with the password masked
#[derive(Debug, Clone, Serialize)]
pub struct MaskedDbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub encrypt: bool,
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub db: DbConfig,
    pub http: HttpServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            db: DbConfig::default(),
            http: HttpServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let environment = get("ENVIRONMENT").unwrap_or_else(default_environment);
        let production = environment.eq_ignore_ascii_case("production");

        let db = DbConfig {
            host: get("DB_HOST").unwrap_or_else(default_db_host),
            port: parse_or(get("DB_PORT"), default_db_port()),
            user: get("DB_USER").unwrap_or_else(default_db_user),
            password: get("DB_PASSWORD").unwrap_or_default(),
            database: get("DB_NAME").unwrap_or_else(default_db_name),
            encrypt: parse_bool(get("DB_ENCRYPT")),
            trust_server_certificate: !production,
            ..DbConfig::default()
        };

        let http = HttpServerConfig {
            host: get("HOST").unwrap_or_else(|| HttpServerConfig::default().host),
            port: parse_or(get("PORT"), HttpServerConfig::default().port),
            cors_origins: get("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        Self {
            environment,
            db,
            http,
        }
    }

    /// Whether the service is running with production hardening
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn parse_bool(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(|s| s.trim().to_ascii_lowercase()),
        Some(ref s) if s == "1" || s == "true" || s == "yes"
    )
}
