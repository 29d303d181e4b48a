//! Configuration loader for the `codemetal-csvflow` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing else in the crate reads `env::var` for
//! application settings.
//!
use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Default row cap for a single uploaded file.
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// Default upload size cap (50 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 50 * 1024 * 1024;

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Port the HTTP server listens on.
    pub http_port: u16,

    /// Maximum number of data rows accepted from one CSV file.
    pub max_rows: usize,

    /// Maximum accepted upload size in bytes.
    pub upload_max_bytes: usize,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `HTTP_PORT` – listen port (default: 8080)
/// - `CSV_MAX_ROWS` – max data rows per file (default: 10000)
/// - `UPLOAD_MAX_BYTES` – max upload size (default: 50 MiB)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);
    let http_port = parse_env!("HTTP_PORT", u16, 8080);
    let max_rows = parse_env!("CSV_MAX_ROWS", usize, DEFAULT_MAX_ROWS);
    let upload_max_bytes = parse_env!("UPLOAD_MAX_BYTES", usize, DEFAULT_UPLOAD_MAX_BYTES);

    if max_rows == 0 {
        return Err(anyhow!("Invalid CSV_MAX_ROWS: must be at least 1"));
    }

    Ok(Config {
        db_url,
        db_pool_max,
        http_port,
        max_rows,
        upload_max_bytes,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all other values.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL     : {}", self.masked_db_url());
        tracing::info!("  DB_POOL_MAX      : {}", self.db_pool_max);
        tracing::info!("  HTTP_PORT        : {}", self.http_port);
        tracing::info!("  CSV_MAX_ROWS     : {}", self.max_rows);
        tracing::info!("  UPLOAD_MAX_BYTES : {}", self.upload_max_bytes);
    }

    /// Database URL with the password (if any) replaced by `****`.
    pub fn masked_db_url(&self) -> String {
        // ---
        let Some(at_pos) = self.db_url.rfind('@') else {
            return self.db_url.clone();
        };
        match self.db_url[..at_pos].rfind(':') {
            // `postgres://host` has a colon only in the scheme separator
            Some(colon_pos) if !self.db_url[colon_pos..].starts_with("://") => format!(
                "{}:****{}",
                &self.db_url[..colon_pos],
                &self.db_url[at_pos..]
            ),
            _ => self.db_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn config_with_url(url: &str) -> Config {
        Config {
            db_url: url.to_string(),
            db_pool_max: 5,
            http_port: 8080,
            max_rows: DEFAULT_MAX_ROWS,
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }

    #[test]
    fn test_masks_password() {
        // ---
        let cfg = config_with_url("postgres://app:s3cret@db:5432/csvflow");
        assert_eq!(cfg.masked_db_url(), "postgres://app:****@db:5432/csvflow");
    }

    #[test]
    fn test_url_without_password_unchanged() {
        // ---
        let cfg = config_with_url("postgres://app@db/csvflow");
        assert_eq!(cfg.masked_db_url(), "postgres://app@db/csvflow");

        let cfg = config_with_url("postgres://db/csvflow");
        assert_eq!(cfg.masked_db_url(), "postgres://db/csvflow");
    }
}
