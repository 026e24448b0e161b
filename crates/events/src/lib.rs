//! Catalog event bus and side-effect dispatchers.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`CatalogEvent`] -- what a listing mutation publishes after its write.
//! - [`AuditDispatcher`] / [`NotificationDispatcher`] -- background loops that
//!   hand events to the audit and notification collaborators, retrying with
//!   [`RetryPolicy`] and logging what still fails.

pub mod bus;
pub mod dispatch;
pub mod retry;

pub use bus::{CatalogEvent, EventBus, NotificationTarget, Recipient};
pub use dispatch::{AuditDispatcher, NotificationDispatcher};
pub use retry::RetryPolicy;
