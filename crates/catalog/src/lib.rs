//! Property catalog service.
//!
//! - [`cache`] -- read-through cache with in-memory and Redis backends.
//! - [`slug`], [`quota`], [`views`] -- slug allocation, listing quotas and
//!   deduplicated view counting.
//! - [`search`] -- query composition, visibility and geo radius filtering.
//! - [`workflow`] -- approval state machine driver.
//! - [`service`] -- [`CatalogService`], the façade the HTTP layer calls.
//! - [`memory_store`] -- in-memory store and collaborator doubles.

pub mod cache;
pub mod config;
pub mod memory_store;
pub mod quota;
pub mod search;
pub mod service;
pub mod slug;
pub mod views;
pub mod workflow;

pub use config::{CacheBackendKind, CatalogConfig};
pub use memory_store::{MemoryAuditSink, MemoryNotifier, MemoryStore};
pub use service::{CatalogService, HealthReport};
