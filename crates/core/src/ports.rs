//! Async traits implemented by storage and collaborator adapters.
//!
//! The catalog depends only on these traits. The Postgres adapter lives in
//! `estate-db`; an in-memory implementation used by tests and local runs
//! lives in `estate-catalog`.

use async_trait::async_trait;

use crate::audit::AuditRecord;
use crate::error::StoreError;
use crate::listing::{
    InquirySummary, Listing, ListingChanges, ListingImage, ListingRecord, UserSummary,
};
use crate::notification::NotificationMessage;
use crate::quota::Subscription;
use crate::search::{ListingPredicate, PageWindow, SortSpec};
use crate::types::{DbId, Timestamp};
use crate::views::{ViewOutcome, ViewerIdentity};

pub type StoreResult<T> = Result<T, StoreError>;

/// Listing rows.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Cheap round trip used by health checks.
    async fn ping(&self) -> StoreResult<()>;

    /// Excludes soft-deleted rows.
    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Listing>>;

    /// Excludes soft-deleted rows.
    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Listing>>;

    /// Whether `slug` belongs to any listing other than `exclude_id`.
    /// Soft-deleted rows still hold their slug.
    async fn slug_exists(&self, slug: &str, exclude_id: Option<DbId>) -> StoreResult<bool>;

    /// Insert the row with its feature tags and images in one transaction.
    /// Fails with [`StoreError::SlugTaken`] on a slug conflict.
    async fn insert(&self, record: &ListingRecord) -> StoreResult<Listing>;

    /// Apply `changes`, images included, in one transaction. `None` when the
    /// listing is missing or soft-deleted. Fails with [`StoreError::SlugTaken`] on a slug conflict.
    async fn update(&self, id: DbId, changes: &ListingChanges) -> StoreResult<Option<Listing>>;

    async fn set_featured_until(
        &self,
        id: DbId,
        until: Option<Timestamp>,
    ) -> StoreResult<Option<Listing>>;

    /// Returns `true` if a live row was marked deleted.
    async fn soft_delete(&self, id: DbId) -> StoreResult<bool>;

    /// Non-deleted listings of `owner_id` outside the terminal statuses.
    async fn count_active_for_owner(&self, owner_id: DbId) -> StoreResult<i64>;

    /// One page of matches plus the total match count.
    async fn search(
        &self,
        predicate: &ListingPredicate,
        sort: SortSpec,
        window: PageWindow,
    ) -> StoreResult<(Vec<Listing>, i64)>;
}

/// Collaborator-owned data attached to a listing detail.
#[async_trait]
pub trait ListingRelations: Send + Sync {
    async fn images(&self, listing_id: DbId) -> StoreResult<Vec<ListingImage>>;

    async fn image_count(&self, listing_id: DbId) -> StoreResult<i64>;

    async fn user_summary(&self, user_id: DbId) -> StoreResult<Option<UserSummary>>;

    async fn recent_inquiries(
        &self,
        listing_id: DbId,
        limit: i64,
    ) -> StoreResult<Vec<InquirySummary>>;
}

/// Deduplicated view events.
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Store a view by `viewer` at `at` and bump `view_count`, unless the
    /// same identity already viewed the listing within
    /// [`DEDUP_WINDOW_SECS`](crate::views::DEDUP_WINDOW_SECS) before `at`.
    ///
    /// The check, the event and the counter are one atomic step: concurrent
    /// calls for one identity count at most once. Missing or soft-deleted
    /// listings yield [`ViewOutcome::Skipped`].
    async fn record_view(
        &self,
        listing_id: DbId,
        viewer: &ViewerIdentity,
        at: Timestamp,
    ) -> StoreResult<ViewOutcome>;
}

#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    async fn find_subscription(&self, user_id: DbId) -> StoreResult<Option<Subscription>>;
}

/// Audit collaborator. Failures are logged by the caller, never surfaced.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> StoreResult<()>;
}

/// Notification collaborator. Same failure policy as [`AuditSink`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user_id: DbId, message: &NotificationMessage) -> StoreResult<()>;

    async fn notify_admins(&self, message: &NotificationMessage) -> StoreResult<()>;
}

/// Everything the catalog service reads and writes directly.
pub trait CatalogStore: ListingStore + ListingRelations + ViewStore + SubscriptionLookup {}

impl<T> CatalogStore for T where T: ListingStore + ListingRelations + ViewStore + SubscriptionLookup {}
