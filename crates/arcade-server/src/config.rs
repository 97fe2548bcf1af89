//! Configuration management

use crate::catalog::MAX_FILE_SIZE;
use crate::ingest::{self, IngestOptions};
use crate::storage::StorageConfig;
use arcade_common::retry::{self, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/arcade";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogBackend,
    pub storage: StorageConfig,
    pub ingest: IngestOptions,
    pub retry: RetryPolicy,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Where game records are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    #[default]
    Postgres,
    /// Process-local store; records are lost on restart
    Memory,
}

impl FromStr for CatalogBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown catalog backend '{}', expected postgres or memory", other),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset or unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let catalog = match std::env::var("ARCADE_CATALOG") {
            Ok(value) => value.parse()?,
            Err(_) => CatalogBackend::default(),
        };

        let config = Config {
            server: ServerConfig {
                host: std::env::var("ARCADE_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("ARCADE_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or("ARCADE_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            catalog,
            storage: StorageConfig::from_env(),
            ingest: IngestOptions {
                large_entry_threshold: env_or(
                    "ARCADE_LARGE_ENTRY_BYTES",
                    ingest::DEFAULT_LARGE_ENTRY_THRESHOLD,
                ),
                max_concurrent_extractions: env_or(
                    "ARCADE_MAX_CONCURRENT_EXTRACTIONS",
                    ingest::default_concurrent_extractions(),
                ),
                max_archive_bytes: env_or("ARCADE_MAX_ARCHIVE_BYTES", ingest::DEFAULT_MAX_ARCHIVE_BYTES),
                max_thumbnail_bytes: env_or(
                    "ARCADE_MAX_THUMBNAIL_BYTES",
                    ingest::DEFAULT_MAX_THUMBNAIL_BYTES,
                ),
            },
            retry: RetryPolicy {
                max_attempts: env_or("ARCADE_RETRY_MAX_ATTEMPTS", retry::DEFAULT_MAX_ATTEMPTS),
                base_delay: Duration::from_millis(env_or(
                    "ARCADE_RETRY_BASE_DELAY_MS",
                    retry::DEFAULT_BASE_DELAY.as_millis() as u64,
                )),
                backoff_factor: env_or("ARCADE_RETRY_BACKOFF_FACTOR", retry::DEFAULT_BACKOFF_FACTOR),
                max_delay: Duration::from_millis(env_or(
                    "ARCADE_RETRY_MAX_DELAY_MS",
                    retry::DEFAULT_MAX_DELAY.as_millis() as u64,
                )),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.catalog == CatalogBackend::Postgres && self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.storage.public_root.as_os_str().is_empty() {
            anyhow::bail!("ARCADE_PUBLIC_ROOT cannot be empty");
        }

        if self.storage.staging_dir.as_os_str().is_empty() {
            anyhow::bail!("ARCADE_STAGING_DIR cannot be empty");
        }

        if self.ingest.max_concurrent_extractions == 0 {
            anyhow::bail!("ARCADE_MAX_CONCURRENT_EXTRACTIONS must be greater than 0");
        }

        if self.ingest.max_archive_bytes == 0 || self.ingest.max_thumbnail_bytes == 0 {
            anyhow::bail!("Upload size limits must be greater than 0");
        }

        if self.ingest.max_archive_bytes > MAX_FILE_SIZE as u64 {
            anyhow::bail!(
                "ARCADE_MAX_ARCHIVE_BYTES ({}) exceeds the catalog limit of {} bytes",
                self.ingest.max_archive_bytes,
                MAX_FILE_SIZE
            );
        }

        self.retry.validate()?;

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }

    /// Largest request body the upload endpoint accepts
    pub fn upload_body_limit(&self) -> usize {
        // multipart framing and text fields on top of both files
        const OVERHEAD: u64 = 1024 * 1024;
        let total = self
            .ingest
            .max_archive_bytes
            .saturating_add(self.ingest.max_thumbnail_bytes)
            .saturating_add(OVERHEAD);
        usize::try_from(total).unwrap_or(usize::MAX)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            catalog: CatalogBackend::default(),
            storage: StorageConfig::default(),
            ingest: IngestOptions::default(),
            retry: RetryPolicy::default(),
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ARCADE_PORT",
        "ARCADE_CATALOG",
        "ARCADE_MAX_CONCURRENT_EXTRACTIONS",
        "ARCADE_RETRY_MAX_ATTEMPTS",
        "ARCADE_RETRY_BASE_DELAY_MS",
        "ARCADE_MAX_ARCHIVE_BYTES",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog, CatalogBackend::Postgres);
        assert_eq!(config.retry.max_attempts, 7);
        assert!(config.ingest.max_concurrent_extractions >= 1);
    }

    #[test]
    fn test_catalog_backend_parsing() {
        assert_eq!("memory".parse::<CatalogBackend>().unwrap(), CatalogBackend::Memory);
        assert_eq!(" Postgres ".parse::<CatalogBackend>().unwrap(), CatalogBackend::Postgres);
        assert!("sqlite".parse::<CatalogBackend>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.ingest.max_concurrent_extractions = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.database.min_connections = 50;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_archive_limit_cannot_exceed_catalog_bound() {
        let mut config = Config::default();
        config.ingest.max_archive_bytes = MAX_FILE_SIZE as u64;
        assert!(config.validate().is_ok());

        config.ingest.max_archive_bytes = MAX_FILE_SIZE as u64 + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ARCADE_MAX_ARCHIVE_BYTES"));
    }

    #[test]
    #[serial]
    fn test_load_rejects_oversized_archive_limit() {
        clear_env();
        std::env::set_var("ARCADE_MAX_ARCHIVE_BYTES", "1073741824");

        let result = Config::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_upload_body_limit_covers_both_files() {
        let config = Config::default();
        let limit = config.upload_body_limit() as u64;
        assert!(limit > config.ingest.max_archive_bytes + config.ingest.max_thumbnail_bytes);
    }

    #[test]
    #[serial]
    fn test_load_reads_environment() {
        clear_env();
        std::env::set_var("ARCADE_PORT", "9100");
        std::env::set_var("ARCADE_CATALOG", "memory");
        std::env::set_var("ARCADE_MAX_CONCURRENT_EXTRACTIONS", "3");
        std::env::set_var("ARCADE_RETRY_MAX_ATTEMPTS", "2");
        std::env::set_var("ARCADE_RETRY_BASE_DELAY_MS", "250");

        let config = Config::load().unwrap();
        clear_env();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.catalog, CatalogBackend::Memory);
        assert_eq!(config.ingest.max_concurrent_extractions, 3);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    }

    #[test]
    #[serial]
    fn test_load_rejects_unknown_backend() {
        clear_env();
        std::env::set_var("ARCADE_CATALOG", "cassandra");

        let result = Config::load();
        clear_env();

        assert!(result.is_err());
    }
}
