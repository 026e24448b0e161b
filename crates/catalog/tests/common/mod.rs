//! Shared harness for catalog service tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use estate_catalog::cache::MemoryCache;
use estate_catalog::{CatalogConfig, CatalogService, MemoryStore};
use estate_core::error::StoreError;
use estate_core::listing::{
    InquirySummary, Listing, ListingChanges, ListingImage, ListingRecord, NewListing,
    NewListingImage, UserSummary,
};
use estate_core::ports::{
    CatalogStore, ListingRelations, ListingStore, StoreResult, SubscriptionLookup, ViewStore,
};
use estate_core::quota::{Subscription, UNLIMITED};
use estate_core::roles::{Actor, Role};
use estate_core::search::{ListingPredicate, PageWindow, SortSpec};
use estate_core::status::{ListingStatus, PropertyType, TransactionKind};
use estate_core::types::{DbId, Timestamp};
use estate_core::views::{ViewOutcome, ViewerIdentity};
use estate_events::{CatalogEvent, EventBus};
use tokio::sync::broadcast;

pub const OWNER: Actor = Actor {
    user_id: 10,
    role: Role::Member,
};
pub const AGENT: Actor = Actor {
    user_id: 11,
    role: Role::Agent,
};
pub const STRANGER: Actor = Actor {
    user_id: 12,
    role: Role::Member,
};
pub const ADMIN: Actor = Actor {
    user_id: 1,
    role: Role::Admin,
};

pub struct Harness {
    pub service: CatalogService,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub bus: Arc<EventBus>,
    events: broadcast::Receiver<CatalogEvent>,
}

pub fn harness() -> Harness {
    let store = seeded_store();
    harness_over(store.clone(), store)
}

/// Harness whose service runs on `service_store`; `store` is the memory
/// store underneath it, used for assertions.
pub fn harness_over(store: Arc<MemoryStore>, service_store: Arc<dyn CatalogStore>) -> Harness {
    let cache = Arc::new(MemoryCache::new());
    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();

    let service = CatalogService::new(
        service_store,
        cache.clone(),
        bus.clone(),
        CatalogConfig::default(),
    );
    Harness {
        service,
        store,
        cache,
        bus,
        events,
    }
}

/// Memory store with the owner, the agent and an unlimited subscription.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_user(UserSummary {
        id: OWNER.user_id,
        name: "Olive Owner".into(),
        email: Some("olive@example.com".into()),
        phone: None,
    });
    store.add_user(UserSummary {
        id: AGENT.user_id,
        name: "Andy Agent".into(),
        email: None,
        phone: Some("555-0101".into()),
    });
    store.set_subscription(Subscription {
        user_id: OWNER.user_id,
        tier: "enterprise".into(),
        max_listings: Some(UNLIMITED),
    });
    store
}

/// Input that passes every submission precondition.
pub fn new_listing(title: &str) -> NewListing {
    NewListing {
        title: title.into(),
        description: Some("Bright and spacious".into()),
        property_type: PropertyType::House,
        transaction_kind: TransactionKind::Sale,
        price: Some(450_000),
        currency: None,
        address: Some("12 Oak Street".into()),
        city: Some("Springfield".into()),
        province: Some("Oregon".into()),
        postal_code: None,
        latitude: None,
        longitude: None,
        bedrooms: Some(4),
        bathrooms: Some(2),
        floor_area: Some(180.0),
        features: vec!["Garden".into()],
        agent_id: None,
        images: vec![NewListingImage {
            url: "https://img.example.com/front.jpg".into(),
            caption: Some("Front".into()),
        }],
        submit: false,
    }
}

impl Harness {
    /// Everything published since the last drain.
    pub fn drain_events(&mut self) -> Vec<CatalogEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub async fn draft(&self, input: NewListing) -> Listing {
        self.service
            .create(input, OWNER)
            .await
            .expect("create should succeed")
            .listing
    }

    pub async fn approved(&self, input: NewListing) -> Listing {
        let draft = self.draft(NewListing {
            submit: true,
            ..input
        })
        .await;
        self.service
            .approve(draft.id, ADMIN)
            .await
            .expect("approve should succeed")
    }
}

/// Store that loses the next `n` slug writes to a concurrent writer: the
/// competing listing is stored under the contested slug, then the write
/// fails with [`StoreError::SlugTaken`].
pub struct RacingStore {
    inner: Arc<MemoryStore>,
    races: AtomicU32,
}

impl RacingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            races: AtomicU32::new(0),
        }
    }

    pub fn lose_next(&self, n: u32) {
        self.races.store(n, Ordering::SeqCst);
    }

    async fn race(&self, slug: &str) -> StoreResult<bool> {
        let lost = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            self.inner.insert(&competing_record(slug)).await?;
        }
        Ok(lost)
    }
}

fn competing_record(slug: &str) -> ListingRecord {
    ListingRecord {
        slug: slug.to_string(),
        title: "Competing listing".into(),
        description: None,
        property_type: PropertyType::Apartment,
        transaction_kind: TransactionKind::Rent,
        price: None,
        currency: "USD".into(),
        address: None,
        city: None,
        province: None,
        postal_code: None,
        latitude: None,
        longitude: None,
        bedrooms: None,
        bathrooms: None,
        floor_area: None,
        features: vec![],
        status: ListingStatus::Draft,
        owner_id: STRANGER.user_id,
        agent_id: None,
        images: vec![],
    }
}

#[async_trait]
impl ListingStore for RacingStore {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Listing>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Listing>> {
        self.inner.find_by_slug(slug).await
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<DbId>) -> StoreResult<bool> {
        self.inner.slug_exists(slug, exclude_id).await
    }

    async fn insert(&self, record: &ListingRecord) -> StoreResult<Listing> {
        if self.race(&record.slug).await? {
            return Err(StoreError::SlugTaken(record.slug.clone()));
        }
        self.inner.insert(record).await
    }

    async fn update(&self, id: DbId, changes: &ListingChanges) -> StoreResult<Option<Listing>> {
        if let Some(slug) = &changes.slug {
            if self.race(slug).await? {
                return Err(StoreError::SlugTaken(slug.clone()));
            }
        }
        self.inner.update(id, changes).await
    }

    async fn set_featured_until(
        &self,
        id: DbId,
        until: Option<Timestamp>,
    ) -> StoreResult<Option<Listing>> {
        self.inner.set_featured_until(id, until).await
    }

    async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        self.inner.soft_delete(id).await
    }

    async fn count_active_for_owner(&self, owner_id: DbId) -> StoreResult<i64> {
        self.inner.count_active_for_owner(owner_id).await
    }

    async fn search(
        &self,
        predicate: &ListingPredicate,
        sort: SortSpec,
        window: PageWindow,
    ) -> StoreResult<(Vec<Listing>, i64)> {
        self.inner.search(predicate, sort, window).await
    }
}

#[async_trait]
impl ListingRelations for RacingStore {
    async fn images(&self, listing_id: DbId) -> StoreResult<Vec<ListingImage>> {
        self.inner.images(listing_id).await
    }

    async fn image_count(&self, listing_id: DbId) -> StoreResult<i64> {
        self.inner.image_count(listing_id).await
    }

    async fn user_summary(&self, user_id: DbId) -> StoreResult<Option<UserSummary>> {
        self.inner.user_summary(user_id).await
    }

    async fn recent_inquiries(
        &self,
        listing_id: DbId,
        limit: i64,
    ) -> StoreResult<Vec<InquirySummary>> {
        self.inner.recent_inquiries(listing_id, limit).await
    }
}

#[async_trait]
impl ViewStore for RacingStore {
    async fn record_view(
        &self,
        listing_id: DbId,
        viewer: &ViewerIdentity,
        at: Timestamp,
    ) -> StoreResult<ViewOutcome> {
        self.inner.record_view(listing_id, viewer, at).await
    }
}

#[async_trait]
impl SubscriptionLookup for RacingStore {
    async fn find_subscription(&self, user_id: DbId) -> StoreResult<Option<Subscription>> {
        self.inner.find_subscription(user_id).await
    }
}
