use std::time::Duration;

use estate_catalog::{CacheBackendKind, CatalogConfig};
use estate_core::quota::{TierLimits, DEFAULT_TIER, DEFAULT_TIER_LIMITS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development except
/// the JWT secret. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on waiting for background tasks after the listener stops.
    pub shutdown_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// Cache transport (default: in-process).
    pub cache_backend: CacheBackendKind,
    /// Required when `cache_backend` is Redis.
    pub redis_url: Option<String>,
    /// Cache TTL and tier limits handed to the catalog service.
    pub catalog: CatalogConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                     |
    /// |------------------------|---------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                   |
    /// | `PORT`                 | `3000`                                      |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                        |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                                        |
    /// | `CACHE_BACKEND`        | `memory`                                    |
    /// | `REDIS_URL`            | --                                          |
    /// | `CACHE_TTL_SECS`       | `300`                                       |
    /// | `FEATURED_CACHE_TTL_SECS` | `CACHE_TTL_SECS`                         |
    /// | `LISTING_TIER_LIMITS`  | `free=3,basic=10,premium=50,enterprise=-1`  |
    /// | `DEFAULT_TIER`         | `free`                                      |
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let cache_backend: CacheBackendKind = std::env::var("CACHE_BACKEND")
            .unwrap_or_else(|_| "memory".into())
            .parse()
            .unwrap_or_else(|e| panic!("CACHE_BACKEND: {e}"));

        let redis_url = std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty());
        if cache_backend == CacheBackendKind::Redis {
            assert!(
                redis_url.is_some(),
                "REDIS_URL must be set when CACHE_BACKEND=redis"
            );
        }

        let cache_ttl_secs: u64 = std::env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("CACHE_TTL_SECS must be a valid u64");
        let featured_cache_ttl_secs: u64 = std::env::var("FEATURED_CACHE_TTL_SECS")
            .map(|v| {
                v.parse()
                    .expect("FEATURED_CACHE_TTL_SECS must be a valid u64")
            })
            .unwrap_or(cache_ttl_secs);

        let tier_table =
            std::env::var("LISTING_TIER_LIMITS").unwrap_or_else(|_| DEFAULT_TIER_LIMITS.into());
        let default_tier = std::env::var("DEFAULT_TIER").unwrap_or_else(|_| DEFAULT_TIER.into());
        let tier_limits = TierLimits::parse(&tier_table, &default_tier)
            .unwrap_or_else(|e| panic!("LISTING_TIER_LIMITS: {e}"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            cache_backend,
            redis_url,
            catalog: CatalogConfig {
                cache_ttl: Duration::from_secs(cache_ttl_secs),
                featured_cache_ttl: Duration::from_secs(featured_cache_ttl_secs),
                tier_limits,
            },
        }
    }
}
