//! Postgres implementation of the catalog storage ports.

use async_trait::async_trait;
use estate_core::error::StoreError;
use estate_core::listing::{
    InquirySummary, Listing, ListingChanges, ListingImage, ListingRecord, UserSummary,
};
use estate_core::ports::{
    ListingRelations, ListingStore, StoreResult, SubscriptionLookup, ViewStore,
};
use estate_core::quota::Subscription;
use estate_core::search::{ListingPredicate, PageWindow, SortSpec};
use estate_core::types::{DbId, Timestamp};
use estate_core::views::{window_start, ViewOutcome, ViewerIdentity};

use crate::models::listing::ListingRow;
use crate::repositories::{
    InquiryRepo, ListingImageRepo, ListingRepo, ListingViewRepo, SubscriptionRepo, UserRepo,
};
use crate::DbPool;

/// Unique constraint guarding listing slugs.
const SLUG_CONSTRAINT: &str = "uq_listings_slug";

/// Translate a driver error into the port error type.
///
/// Connection-level failures become [`StoreError::Unavailable`]; a slug
/// unique violation becomes [`StoreError::SlugTaken`].
pub(crate) fn map_sqlx_error(err: sqlx::Error, slug: Option<&str>) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(SLUG_CONSTRAINT)
            {
                return StoreError::SlugTaken(slug.unwrap_or_default().to_string());
            }
            StoreError::Query(db_err.to_string())
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    map_sqlx_error(err, None)
}

fn to_listing(row: Option<ListingRow>) -> StoreResult<Option<Listing>> {
    row.map(Listing::try_from).transpose()
}

/// Storage handle over a Postgres pool. Cheap to clone.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: DbPool,
}

impl PgCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for PgCatalogStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await.map_err(db_err)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Listing>> {
        to_listing(ListingRepo::find_by_id(&self.pool, id).await.map_err(db_err)?)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Listing>> {
        to_listing(ListingRepo::find_by_slug(&self.pool, slug).await.map_err(db_err)?)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<DbId>) -> StoreResult<bool> {
        ListingRepo::slug_exists(&self.pool, slug, exclude_id)
            .await
            .map_err(db_err)
    }

    async fn insert(&self, record: &ListingRecord) -> StoreResult<Listing> {
        let row = ListingRepo::create(&self.pool, record)
            .await
            .map_err(|e| map_sqlx_error(e, Some(&record.slug)))?;
        Listing::try_from(row)
    }

    async fn update(&self, id: DbId, changes: &ListingChanges) -> StoreResult<Option<Listing>> {
        let row = ListingRepo::update(&self.pool, id, changes)
            .await
            .map_err(|e| map_sqlx_error(e, changes.slug.as_deref()))?;
        to_listing(row)
    }

    async fn set_featured_until(
        &self,
        id: DbId,
        until: Option<Timestamp>,
    ) -> StoreResult<Option<Listing>> {
        to_listing(
            ListingRepo::set_featured_until(&self.pool, id, until)
                .await
                .map_err(db_err)?,
        )
    }

    async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        ListingRepo::soft_delete(&self.pool, id).await.map_err(db_err)
    }

    async fn count_active_for_owner(&self, owner_id: DbId) -> StoreResult<i64> {
        ListingRepo::count_active_for_owner(&self.pool, owner_id)
            .await
            .map_err(db_err)
    }

    async fn search(
        &self,
        predicate: &ListingPredicate,
        sort: SortSpec,
        window: PageWindow,
    ) -> StoreResult<(Vec<Listing>, i64)> {
        let total = ListingRepo::count(&self.pool, predicate)
            .await
            .map_err(db_err)?;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }
        let rows = ListingRepo::search(&self.pool, predicate, sort, window)
            .await
            .map_err(db_err)?;
        let listings = rows
            .into_iter()
            .map(Listing::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((listings, total))
    }
}

#[async_trait]
impl ListingRelations for PgCatalogStore {
    async fn images(&self, listing_id: DbId) -> StoreResult<Vec<ListingImage>> {
        let rows = ListingImageRepo::list_for_listing(&self.pool, listing_id)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(ListingImage::from).collect())
    }

    async fn image_count(&self, listing_id: DbId) -> StoreResult<i64> {
        ListingImageRepo::count_for_listing(&self.pool, listing_id)
            .await
            .map_err(db_err)
    }

    async fn user_summary(&self, user_id: DbId) -> StoreResult<Option<UserSummary>> {
        let row = UserRepo::find_summary(&self.pool, user_id)
            .await
            .map_err(db_err)?;
        Ok(row.map(UserSummary::from))
    }

    async fn recent_inquiries(
        &self,
        listing_id: DbId,
        limit: i64,
    ) -> StoreResult<Vec<InquirySummary>> {
        let rows = InquiryRepo::recent_for_listing(&self.pool, listing_id, limit)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(InquirySummary::from).collect())
    }
}

#[async_trait]
impl ViewStore for PgCatalogStore {
    async fn record_view(
        &self,
        listing_id: DbId,
        viewer: &ViewerIdentity,
        at: Timestamp,
    ) -> StoreResult<ViewOutcome> {
        let counted =
            ListingViewRepo::record_if_new(&self.pool, listing_id, viewer, at, window_start(at))
                .await
                .map_err(db_err)?;
        Ok(match counted {
            None => ViewOutcome::Skipped,
            Some(true) => ViewOutcome::Recorded,
            Some(false) => ViewOutcome::Deduplicated,
        })
    }
}

#[async_trait]
impl SubscriptionLookup for PgCatalogStore {
    async fn find_subscription(&self, user_id: DbId) -> StoreResult<Option<Subscription>> {
        let row = SubscriptionRepo::find_by_user(&self.pool, user_id)
            .await
            .map_err(db_err)?;
        Ok(row.map(Subscription::from))
    }
}
