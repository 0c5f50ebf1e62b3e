//! Configuration management for the server.

use memverse_engine::ReferencePolicy;
use std::env;
use std::str::FromStr;

/// Which entity store backs the sync endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL via `DATABASE_URL`
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidStoreBackend(other.to_string())),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Entity store implementation
    pub store_backend: StoreBackend,
    /// PostgreSQL connection URL (required for the postgres backend)
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections
    pub max_connections: u32,
    /// Shared bearer token; when unset, requests are not authenticated
    pub auth_secret: Option<String>,
    /// How pushes with dangling references are treated
    pub reference_policy: ReferencePolicy,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidMaxConnections)?;

        let auth_secret = env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty());

        let reference_policy = match env::var("REFERENCE_POLICY") {
            Ok(value) => value.parse().map_err(ConfigError::InvalidReferencePolicy)?,
            Err(_) => ReferencePolicy::default(),
        };

        Ok(Self {
            host,
            port,
            store_backend,
            database_url,
            max_connections,
            auth_secret,
            reference_policy,
        })
    }

    /// Configuration for an in-memory server, used by tests and local runs.
    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            store_backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            auth_secret: None,
            reference_policy: ReferencePolicy::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required for the postgres store")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid DATABASE_MAX_CONNECTIONS value")]
    InvalidMaxConnections,

    #[error("Invalid STORE_BACKEND value: {0}")]
    InvalidStoreBackend(String),

    #[error("Invalid REFERENCE_POLICY value: {0}")]
    InvalidReferencePolicy(String),
}
