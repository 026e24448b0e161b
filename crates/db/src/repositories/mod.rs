//! Repository structs, one per table (or closely related table group).
//!
//! Each repository is a zero-sized unit struct whose async functions take a
//! `&PgPool` (or a connection, for steps of a larger transaction) and return
//! `sqlx::Error` on failure.

pub mod audit_repo;
pub mod inquiry_repo;
pub mod listing_image_repo;
pub mod listing_repo;
pub mod listing_view_repo;
pub mod notification_repo;
pub mod subscription_repo;
pub mod user_repo;

pub use audit_repo::AuditLogRepo;
pub use inquiry_repo::InquiryRepo;
pub use listing_image_repo::ListingImageRepo;
pub use listing_repo::ListingRepo;
pub use listing_view_repo::ListingViewRepo;
pub use notification_repo::NotificationRepo;
pub use subscription_repo::SubscriptionRepo;
pub use user_repo::UserRepo;
