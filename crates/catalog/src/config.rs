use std::str::FromStr;
use std::time::Duration;

use estate_core::quota::TierLimits;

use crate::cache::DEFAULT_TTL;

/// Which [`CacheBackend`](crate::cache::CacheBackend) the service runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Redis,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend '{other}', expected memory or redis")),
        }
    }
}

/// Tunables of the catalog service.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Lifetime of detail and search cache entries.
    pub cache_ttl: Duration,
    /// Lifetime of the featured collection.
    pub featured_cache_ttl: Duration,
    /// Active-listing ceilings per subscription tier.
    pub tier_limits: TierLimits,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            featured_cache_ttl: DEFAULT_TTL,
            tier_limits: TierLimits::default(),
        }
    }
}
