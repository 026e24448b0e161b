//! In-memory implementations of the storage and collaborator ports.
//!
//! Semantics follow the Postgres adapter: soft-deleted rows are invisible to
//! reads but keep their slug, `published_at` is written once, and slug
//! conflicts surface as [`StoreError::SlugTaken`]. Used by the service and
//! HTTP tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use estate_core::audit::AuditRecord;
use estate_core::error::StoreError;
use estate_core::listing::{
    InquirySummary, Listing, ListingChanges, ListingImage, ListingRecord, NewListingImage,
    UserSummary,
};
use estate_core::notification::NotificationMessage;
use estate_core::ports::{
    AuditSink, ListingRelations, ListingStore, Notifier, StoreResult, SubscriptionLookup,
    ViewStore,
};
use estate_core::quota::Subscription;
use estate_core::search::{ListingPredicate, PageWindow, SortSpec};
use estate_core::types::{DbId, Timestamp};
use estate_core::views::{within_window, ViewOutcome, ViewerIdentity};
use estate_core::workflow::ReasonUpdate;
use estate_events::Recipient;

#[derive(Default)]
struct Tables {
    next_listing_id: DbId,
    next_image_id: DbId,
    next_inquiry_id: DbId,
    listings: BTreeMap<DbId, Listing>,
    images: HashMap<DbId, Vec<ListingImage>>,
    users: HashMap<DbId, UserSummary>,
    subscriptions: HashMap<DbId, Subscription>,
    inquiries: HashMap<DbId, Vec<InquirySummary>>,
    views: Vec<(DbId, ViewerIdentity, Timestamp)>,
}

impl Tables {
    fn live(&self, id: DbId) -> Option<&Listing> {
        self.listings.get(&id).filter(|l| !l.is_deleted())
    }

    fn slug_held_by_other(&self, slug: &str, exclude_id: Option<DbId>) -> bool {
        self.listings
            .values()
            .any(|l| l.slug == slug && Some(l.id) != exclude_id)
    }

    fn put_images(&mut self, listing_id: DbId, images: &[NewListingImage]) {
        let mut stored = Vec::with_capacity(images.len());
        for (position, image) in images.iter().enumerate() {
            self.next_image_id += 1;
            stored.push(ListingImage {
                id: self.next_image_id,
                listing_id,
                url: image.url.trim().to_string(),
                caption: image.caption.clone(),
                position: position as i32,
            });
        }
        self.images.insert(listing_id, stored);
    }
}

/// Process-local listing store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    image_writes_failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every write that carries images fail with
    /// [`StoreError::Unavailable`], leaving the row untouched.
    pub fn set_image_writes_failing(&self, failing: bool) {
        self.image_writes_failing.store(failing, Ordering::SeqCst);
    }

    fn check_image_write(&self) -> StoreResult<()> {
        if self.image_writes_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("image write failed".into()));
        }
        Ok(())
    }

    pub fn add_user(&self, user: UserSummary) {
        if let Ok(mut t) = self.tables.lock() {
            t.users.insert(user.id, user);
        }
    }

    pub fn set_subscription(&self, subscription: Subscription) {
        if let Ok(mut t) = self.tables.lock() {
            t.subscriptions.insert(subscription.user_id, subscription);
        }
    }

    pub fn add_inquiry(&self, listing_id: DbId, sender_name: &str, message: &str) {
        if let Ok(mut t) = self.tables.lock() {
            t.next_inquiry_id += 1;
            let inquiry = InquirySummary {
                id: t.next_inquiry_id,
                sender_name: sender_name.to_string(),
                message: message.to_string(),
                created_at: Utc::now(),
            };
            t.inquiries.entry(listing_id).or_default().push(inquiry);
        }
    }

    /// Stored view events for a listing, soft-deleted or not.
    pub fn view_events(&self, listing_id: DbId) -> usize {
        self.tables
            .lock()
            .map(|t| t.views.iter().filter(|(id, _, _)| *id == listing_id).count())
            .unwrap_or(0)
    }

    /// Raw row, including soft-deleted ones.
    pub fn raw_listing(&self, id: DbId) -> Option<Listing> {
        self.tables.lock().ok()?.listings.get(&id).cloned()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".into()))?;
        f(&mut tables)
    }
}

fn apply_changes(listing: &mut Listing, changes: &ListingChanges, now: Timestamp) {
    fn set<T: Clone>(field: &mut T, value: &Option<T>) {
        if let Some(v) = value {
            *field = v.clone();
        }
    }
    fn set_opt<T: Clone>(field: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            field.clone_from(value);
        }
    }

    set(&mut listing.slug, &changes.slug);
    set(&mut listing.title, &changes.title);
    set_opt(&mut listing.description, &changes.description);
    set(&mut listing.property_type, &changes.property_type);
    set(&mut listing.transaction_kind, &changes.transaction_kind);
    set_opt(&mut listing.price, &changes.price);
    set(&mut listing.currency, &changes.currency);
    set_opt(&mut listing.address, &changes.address);
    set_opt(&mut listing.city, &changes.city);
    set_opt(&mut listing.province, &changes.province);
    set_opt(&mut listing.postal_code, &changes.postal_code);
    set_opt(&mut listing.latitude, &changes.latitude);
    set_opt(&mut listing.longitude, &changes.longitude);
    set_opt(&mut listing.bedrooms, &changes.bedrooms);
    set_opt(&mut listing.bathrooms, &changes.bathrooms);
    set_opt(&mut listing.floor_area, &changes.floor_area);
    set(&mut listing.features, &changes.features);

    if let Some(state) = &changes.state {
        listing.status = state.status;
        listing.approval_status = state.approval_status;
        match &state.rejection_reason {
            ReasonUpdate::Set(reason) => listing.rejection_reason = Some(reason.clone()),
            ReasonUpdate::Clear => listing.rejection_reason = None,
            ReasonUpdate::Keep => {}
        }
        if let Some((by, at)) = state.approval {
            listing.approved_by = Some(by);
            listing.approved_at = Some(at);
        }
        if listing.published_at.is_none() {
            listing.published_at = state.published_at;
        }
    }
    listing.updated_at = now;
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.with_tables(|_| Ok(()))
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Listing>> {
        self.with_tables(|t| Ok(t.live(id).cloned()))
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Listing>> {
        self.with_tables(|t| {
            Ok(t
                .listings
                .values()
                .find(|l| l.slug == slug && !l.is_deleted())
                .cloned())
        })
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<DbId>) -> StoreResult<bool> {
        self.with_tables(|t| Ok(t.slug_held_by_other(slug, exclude_id)))
    }

    async fn insert(&self, record: &ListingRecord) -> StoreResult<Listing> {
        self.with_tables(|t| {
            if t.slug_held_by_other(&record.slug, None) {
                return Err(StoreError::SlugTaken(record.slug.clone()));
            }
            if !record.images.is_empty() {
                self.check_image_write()?;
            }
            t.next_listing_id += 1;
            let now = Utc::now();
            let listing = Listing {
                id: t.next_listing_id,
                slug: record.slug.clone(),
                title: record.title.clone(),
                description: record.description.clone(),
                property_type: record.property_type,
                transaction_kind: record.transaction_kind,
                price: record.price,
                currency: record.currency.clone(),
                address: record.address.clone(),
                city: record.city.clone(),
                province: record.province.clone(),
                postal_code: record.postal_code.clone(),
                latitude: record.latitude,
                longitude: record.longitude,
                bedrooms: record.bedrooms,
                bathrooms: record.bathrooms,
                floor_area: record.floor_area,
                features: record.features.clone(),
                status: record.status,
                approval_status: record.status.approval_status(),
                rejection_reason: None,
                approved_at: None,
                approved_by: None,
                published_at: None,
                featured_until: None,
                view_count: 0,
                save_count: 0,
                owner_id: record.owner_id,
                agent_id: record.agent_id,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            };
            t.listings.insert(listing.id, listing.clone());
            t.put_images(listing.id, &record.images);
            Ok(listing)
        })
    }

    async fn update(&self, id: DbId, changes: &ListingChanges) -> StoreResult<Option<Listing>> {
        self.with_tables(|t| {
            if t.live(id).is_none() {
                return Ok(None);
            }
            if let Some(slug) = &changes.slug {
                if t.slug_held_by_other(slug, Some(id)) {
                    return Err(StoreError::SlugTaken(slug.clone()));
                }
            }
            if changes.images.is_some() {
                self.check_image_write()?;
            }
            let Some(listing) = t.listings.get_mut(&id) else {
                return Ok(None);
            };
            apply_changes(listing, changes, Utc::now());
            let updated = listing.clone();
            if let Some(images) = &changes.images {
                t.put_images(id, images);
            }
            Ok(Some(updated))
        })
    }

    async fn set_featured_until(
        &self,
        id: DbId,
        until: Option<Timestamp>,
    ) -> StoreResult<Option<Listing>> {
        self.with_tables(|t| {
            Ok(t
                .listings
                .get_mut(&id)
                .filter(|l| !l.is_deleted())
                .map(|l| {
                    l.featured_until = until;
                    l.updated_at = Utc::now();
                    l.clone()
                }))
        })
    }

    async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        self.with_tables(|t| match t.listings.get_mut(&id) {
            Some(l) if !l.is_deleted() => {
                l.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        })
    }

    async fn count_active_for_owner(&self, owner_id: DbId) -> StoreResult<i64> {
        self.with_tables(|t| {
            Ok(t
                .listings
                .values()
                .filter(|l| l.owner_id == owner_id && !l.is_deleted() && !l.status.is_terminal())
                .count() as i64)
        })
    }

    async fn search(
        &self,
        predicate: &ListingPredicate,
        sort: SortSpec,
        window: PageWindow,
    ) -> StoreResult<(Vec<Listing>, i64)> {
        self.with_tables(|t| {
            let mut matches: Vec<&Listing> =
                t.listings.values().filter(|l| predicate.matches(l)).collect();
            matches.sort_by(|a, b| sort.compare(a, b));
            let total = matches.len() as i64;
            let page = matches
                .into_iter()
                .skip(window.offset.max(0) as usize)
                .take(window.limit.max(0) as usize)
                .cloned()
                .collect();
            Ok((page, total))
        })
    }
}

#[async_trait]
impl ListingRelations for MemoryStore {
    async fn images(&self, listing_id: DbId) -> StoreResult<Vec<ListingImage>> {
        self.with_tables(|t| Ok(t.images.get(&listing_id).cloned().unwrap_or_default()))
    }

    async fn image_count(&self, listing_id: DbId) -> StoreResult<i64> {
        self.with_tables(|t| Ok(t.images.get(&listing_id).map_or(0, |v| v.len() as i64)))
    }

    async fn user_summary(&self, user_id: DbId) -> StoreResult<Option<UserSummary>> {
        self.with_tables(|t| Ok(t.users.get(&user_id).cloned()))
    }

    async fn recent_inquiries(
        &self,
        listing_id: DbId,
        limit: i64,
    ) -> StoreResult<Vec<InquirySummary>> {
        self.with_tables(|t| {
            let mut all = t.inquiries.get(&listing_id).cloned().unwrap_or_default();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            all.truncate(limit.max(0) as usize);
            Ok(all)
        })
    }
}

#[async_trait]
impl ViewStore for MemoryStore {
    async fn record_view(
        &self,
        listing_id: DbId,
        viewer: &ViewerIdentity,
        at: Timestamp,
    ) -> StoreResult<ViewOutcome> {
        self.with_tables(|t| {
            if t.live(listing_id).is_none() {
                return Ok(ViewOutcome::Skipped);
            }
            let seen = t.views.iter().any(|(id, who, when)| {
                *id == listing_id && who == viewer && within_window(*when, at)
            });
            if seen {
                return Ok(ViewOutcome::Deduplicated);
            }
            t.views.push((listing_id, viewer.clone(), at));
            if let Some(l) = t.listings.get_mut(&listing_id) {
                l.view_count += 1;
            }
            Ok(ViewOutcome::Recorded)
        })
    }
}

#[async_trait]
impl SubscriptionLookup for MemoryStore {
    async fn find_subscription(&self, user_id: DbId) -> StoreResult<Option<Subscription>> {
        self.with_tables(|t| Ok(t.subscriptions.get(&user_id).cloned()))
    }
}

/// Audit sink that keeps every record.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn actions_for(&self, listing_id: DbId) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.entity_id == listing_id)
            .map(|r| r.action)
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: &AuditRecord) -> StoreResult<()> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("audit sink poisoned".into()))?
            .push(record.clone());
        Ok(())
    }
}

/// Notifier that keeps every delivered message with its recipient.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<(Recipient, NotificationMessage)>>,
}

impl MemoryNotifier {
    pub fn sent(&self) -> Vec<(Recipient, NotificationMessage)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn push(&self, recipient: Recipient, message: &NotificationMessage) -> StoreResult<()> {
        self.sent
            .lock()
            .map_err(|_| StoreError::Unavailable("notifier poisoned".into()))?
            .push((recipient, message.clone()));
        Ok(())
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify_user(&self, user_id: DbId, message: &NotificationMessage) -> StoreResult<()> {
        self.push(Recipient::User(user_id), message)
    }

    async fn notify_admins(&self, message: &NotificationMessage) -> StoreResult<()> {
        self.push(Recipient::Admins, message)
    }
}
