//! Runtime configuration loaded from environment variables.
//!
//! Command-line flags take precedence over the environment; see `main.rs`.

use std::path::PathBuf;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::db::Database;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Bind address (from QUOTER_HOST)
    pub host: String,
    /// HTTP port (from QUOTER_PORT)
    pub port: u16,
    /// SQLite file (from QUOTER_DB_PATH). Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// wkhtmltopdf executable (from QUOTER_WKHTMLTOPDF). Defaults to a PATH lookup.
    pub wkhtmltopdf: Option<PathBuf>,
    /// Allowed CORS origins (from QUOTER_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_path: None,
            wkhtmltopdf: None,
            cors_origins: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("QUOTER_PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid QUOTER_PORT {:?}", raw);
                defaults.port
            }),
            None => defaults.port,
        };

        let cors_origins = lookup("QUOTER_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });

        Self {
            host: lookup("QUOTER_HOST").unwrap_or(defaults.host),
            port,
            database_path: lookup("QUOTER_DB_PATH").map(PathBuf::from),
            wkhtmltopdf: lookup("QUOTER_WKHTMLTOPDF").map(PathBuf::from),
            cors_origins,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open (creating if needed) and migrate the configured database.
    pub fn open_database(&self) -> anyhow::Result<Database> {
        let db = match &self.database_path {
            Some(path) => Database::open(path.clone())?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let Some(origins) = &self.cors_origins else {
            return CorsLayer::permissive();
        };

        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
    }
}
