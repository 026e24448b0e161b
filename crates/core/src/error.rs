use std::fmt::Display;

use crate::status::ListingStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Property is incomplete, missing: {}", .missing.join(", "))]
    IncompleteProperty { missing: Vec<&'static str> },

    #[error("Property must have at least one image before submission")]
    NoImages,

    #[error("Cannot {action} a listing in status {from}")]
    InvalidTransition {
        action: &'static str,
        from: ListingStatus,
    },

    #[error("Listing limit reached: tier '{tier}' allows {limit} active listings")]
    ListingLimitReached { tier: String, limit: i64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] keyed by anything printable
    /// (an id or a slug).
    pub fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Errors raised by storage and collaborator adapters.
///
/// Adapters translate their driver errors into this type so the catalog never
/// sees `sqlx` or `redis` types directly.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The slug unique constraint rejected a write.
    #[error("slug already taken: {0}")]
    SlugTaken(String),

    /// A persisted row could not be mapped back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The store rejected a statement for any other reason.
    #[error("query failed: {0}")]
    Query(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CoreError::StoreUnavailable(msg),
            StoreError::SlugTaken(slug) => {
                CoreError::Internal(format!("slug '{slug}' collided after retries"))
            }
            StoreError::Corrupt(msg) | StoreError::Query(msg) => CoreError::Internal(msg),
        }
    }
}
