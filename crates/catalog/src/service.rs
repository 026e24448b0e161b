//! The property catalog façade.
//!
//! [`CatalogService`] composes the slug allocator, quota guard, view
//! deduplicator, search composer and approval workflow over injected store,
//! cache and event bus handles. Every mutation checks its preconditions,
//! performs one primary write, drops the listing's detail cache entries and
//! only then publishes its event.

use std::sync::Arc;

use chrono::{Duration, Utc};
use estate_core::audit::{action_types, AuditRecord};
use estate_core::error::{CoreError, StoreError};
use estate_core::listing::{
    Listing, ListingChanges, ListingDetail, ListingPatch, ListingRecord, ListingSummary,
    NewListing, DEFAULT_CURRENCY, RECENT_INQUIRY_LIMIT,
};
use estate_core::ports::CatalogStore;
use estate_core::roles::Actor;
use estate_core::search::{normalize_tags, ListingQuery, PagedResult};
use estate_core::status::ListingStatus;
use estate_core::types::DbId;
use estate_core::views::{ViewOutcome, ViewerIdentity};
use estate_core::workflow::{ensure_deletable, is_significant_edit, StateChange, Transition};
use estate_events::{CatalogEvent, EventBus};
use serde::Serialize;

use crate::cache::{keys, Cache, CacheBackend};
use crate::config::CatalogConfig;
use crate::quota::QuotaGuard;
use crate::search::SearchComposer;
use crate::slug::SlugAllocator;
use crate::views::ViewDeduplicator;
use crate::workflow::{transition_event, ApprovalWorkflow};

/// Attempts at a write that can lose a slug race to a concurrent writer.
pub const SLUG_WRITE_ATTEMPTS: u32 = 3;

/// Allowed featuring window, in days.
pub const FEATURE_DAYS: std::ops::RangeInclusive<i64> = 1..=365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub store_healthy: bool,
    pub cache_healthy: bool,
}

pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
    bus: Arc<EventBus>,
    slugs: SlugAllocator,
    quota: QuotaGuard,
    views: ViewDeduplicator,
    search: SearchComposer,
    workflow: ApprovalWorkflow,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        cache_backend: Arc<dyn CacheBackend>,
        bus: Arc<EventBus>,
        config: CatalogConfig,
    ) -> Self {
        let cache = Cache::new(cache_backend, config.cache_ttl);
        Self {
            slugs: SlugAllocator::new(store.clone()),
            quota: QuotaGuard::new(store.clone(), config.tier_limits),
            views: ViewDeduplicator::new(store.clone()),
            search: SearchComposer::new(store.clone(), cache.clone(), config.featured_cache_ttl),
            workflow: ApprovalWorkflow::new(store.clone(), bus.clone()),
            store,
            cache,
            bus,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn search(
        &self,
        query: &ListingQuery,
        caller: Option<Actor>,
    ) -> Result<PagedResult<ListingSummary>, CoreError> {
        self.search.search(query, caller).await
    }

    pub async fn get_featured(&self, limit: Option<i64>) -> Result<Vec<ListingSummary>, CoreError> {
        self.search.featured(limit).await
    }

    /// Look a listing up by numeric id or by slug.
    ///
    /// A numeric key that matches no id is retried as a slug. Listings that
    /// are not `APPROVED` are reported as missing to everyone except their
    /// owner, their agent and administrators.
    pub async fn get_by_id_or_slug(
        &self,
        key: &str,
        caller: Option<Actor>,
    ) -> Result<ListingDetail, CoreError> {
        let key = key.trim();
        let detail = match key.parse::<DbId>() {
            Ok(id) => match self.cached_detail_by_id(id).await {
                Err(CoreError::NotFound { .. }) => self.cached_detail_by_slug(key).await,
                other => other,
            },
            Err(_) => self.cached_detail_by_slug(key).await,
        }?;

        let listing = &detail.listing;
        let participant = caller.is_some_and(|a| a.participates_in(listing));
        let admin = caller.is_some_and(|a| a.is_admin());
        if listing.status != ListingStatus::Approved && !participant && !admin {
            return Err(CoreError::not_found("listing", key));
        }

        let mut detail = detail;
        if participant {
            detail.recent_inquiries = self
                .store
                .recent_inquiries(detail.listing.id, RECENT_INQUIRY_LIMIT)
                .await?;
        }
        Ok(detail)
    }

    async fn cached_detail_by_id(&self, id: DbId) -> Result<ListingDetail, CoreError> {
        self.cache
            .get_or_set(&keys::detail_by_id(id), None, move || async move {
                let listing = self
                    .store
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("listing", id))?;
                self.load_detail(listing).await
            })
            .await
    }

    async fn cached_detail_by_slug(&self, slug: &str) -> Result<ListingDetail, CoreError> {
        self.cache
            .get_or_set(&keys::detail_by_slug(slug), None, move || async move {
                let listing = self
                    .store
                    .find_by_slug(slug)
                    .await?
                    .ok_or_else(|| CoreError::not_found("listing", slug))?;
                self.load_detail(listing).await
            })
            .await
    }

    /// Caller-independent detail; inquiries are attached per request.
    async fn load_detail(&self, listing: Listing) -> Result<ListingDetail, CoreError> {
        let images = self.store.images(listing.id).await?;
        let owner = self.store.user_summary(listing.owner_id).await?;
        let agent = match listing.agent_id {
            Some(agent_id) => self.store.user_summary(agent_id).await?,
            None => None,
        };
        Ok(ListingDetail {
            listing,
            images,
            owner,
            agent,
            recent_inquiries: Vec::new(),
        })
    }

    /// Detail as returned to the actor who just changed the listing.
    async fn detail_for(&self, listing: Listing, actor: Actor) -> Result<ListingDetail, CoreError> {
        let participant = actor.participates_in(&listing);
        let mut detail = self.load_detail(listing).await?;
        if participant {
            detail.recent_inquiries = self
                .store
                .recent_inquiries(detail.listing.id, RECENT_INQUIRY_LIMIT)
                .await?;
        }
        Ok(detail)
    }

    async fn load_live(&self, id: DbId) -> Result<Listing, CoreError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("listing", id))
    }

    // -----------------------------------------------------------------------
    // Create / update / delete
    // -----------------------------------------------------------------------

    pub async fn create(&self, input: NewListing, owner: Actor) -> Result<ListingDetail, CoreError> {
        input.validate()?;

        let status = if input.submit {
            ListingStatus::PendingApproval
        } else {
            ListingStatus::Draft
        };
        let mut record = ListingRecord {
            slug: String::new(),
            title: input.title.trim().to_string(),
            description: input.description,
            property_type: input.property_type,
            transaction_kind: input.transaction_kind,
            price: input.price,
            currency: input
                .currency
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            address: input.address,
            city: input.city,
            province: input.province,
            postal_code: input.postal_code,
            latitude: input.latitude,
            longitude: input.longitude,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            floor_area: input.floor_area,
            features: normalize_tags(input.features.iter().map(String::as_str)),
            status,
            owner_id: owner.user_id,
            agent_id: input.agent_id,
            images: input.images,
        };

        if input.submit {
            let missing = record.missing_for_submission();
            if !missing.is_empty() {
                return Err(CoreError::IncompleteProperty { missing });
            }
            if record.images.is_empty() {
                return Err(CoreError::NoImages);
            }
        }
        self.quota.assert_within_quota(owner.user_id).await?;

        let mut attempt = 1;
        let listing = loop {
            record.slug = self.slugs.allocate(&record.title, None).await?;
            match self.store.insert(&record).await {
                Err(StoreError::SlugTaken(slug)) if attempt < SLUG_WRITE_ATTEMPTS => {
                    tracing::warn!(slug = %slug, attempt, "Slug taken concurrently, reallocating");
                    attempt += 1;
                }
                other => break other?,
            }
        };
        self.cache
            .invalidate_listing(listing.id, &[listing.slug.as_str()])
            .await;

        tracing::info!(
            listing_id = listing.id,
            owner_id = owner.user_id,
            slug = %listing.slug,
            status = %listing.status,
            "Listing created"
        );
        self.bus.publish(
            CatalogEvent::new("listing.created", listing.id, owner.user_id).with_audit(
                AuditRecord::listing(owner.user_id, action_types::LISTING_CREATE, listing.id)
                    .with_values(None, Some(content_values(&listing))),
            ),
        );
        if input.submit {
            // The row went straight to review; audit and notify as a submission.
            let draft = Listing {
                status: ListingStatus::Draft,
                ..listing.clone()
            };
            self.bus
                .publish(transition_event(Transition::Submit, &draft, &listing, owner));
        }

        self.detail_for(listing, owner).await
    }

    /// Apply a partial update.
    ///
    /// A title change recomputes the slug. Changing a moderated field of an
    /// `APPROVED` listing sends it back to review in the same write.
    pub async fn update(
        &self,
        id: DbId,
        patch: ListingPatch,
        actor: Actor,
    ) -> Result<ListingDetail, CoreError> {
        patch.validate()?;
        let before = self.load_live(id).await?;
        actor.authorize(&before, false)?;

        let mut changes = ListingChanges::from_patch(&patch);
        let retitled = changes
            .title
            .as_deref()
            .filter(|title| *title != before.title)
            .map(str::to_string);

        let requeue = before.status == ListingStatus::Approved && is_significant_edit(&before, &patch);
        if requeue {
            changes.state = Some(StateChange::for_transition(
                Transition::SignificantEdit,
                actor.user_id,
                None,
                Utc::now(),
            )?);
        }

        let after = match &retitled {
            Some(title) => {
                let mut attempt = 1;
                loop {
                    let slug = self.slugs.allocate(title, Some(id)).await?;
                    changes.slug = (slug != before.slug).then_some(slug);
                    match self.store.update(id, &changes).await {
                        Err(StoreError::SlugTaken(slug)) if attempt < SLUG_WRITE_ATTEMPTS => {
                            tracing::warn!(slug = %slug, attempt, "Slug taken concurrently, reallocating");
                            attempt += 1;
                        }
                        other => break other?,
                    }
                }
            }
            None => self.store.update(id, &changes).await?,
        }
        .ok_or_else(|| CoreError::not_found("listing", id))?;

        self.cache
            .invalidate_listing(id, &[before.slug.as_str(), after.slug.as_str()])
            .await;

        tracing::info!(
            listing_id = id,
            actor_id = actor.user_id,
            requeued = requeue,
            "Listing updated"
        );
        self.bus.publish(
            CatalogEvent::new("listing.updated", id, actor.user_id).with_audit(
                AuditRecord::listing(actor.user_id, action_types::LISTING_UPDATE, id)
                    .with_values(Some(content_values(&before)), Some(content_values(&after)))
                    .with_target(after.owner_id),
            ),
        );
        if requeue {
            self.bus.publish(transition_event(
                Transition::SignificantEdit,
                &before,
                &after,
                actor,
            ));
        }

        self.detail_for(after, actor).await
    }

    /// Soft delete. Owners, agents and administrators may delete any
    /// listing that has not reached a terminal status.
    pub async fn delete(&self, id: DbId, actor: Actor) -> Result<(), CoreError> {
        let listing = self.load_live(id).await?;
        actor.authorize(&listing, true)?;
        ensure_deletable(listing.status)?;

        if !self.store.soft_delete(id).await? {
            return Err(CoreError::not_found("listing", id));
        }
        self.cache
            .invalidate_listing(id, &[listing.slug.as_str()])
            .await;
        if listing.featured_until.is_some() {
            self.cache.delete_pattern(keys::FEATURED_PATTERN).await;
        }

        tracing::info!(listing_id = id, actor_id = actor.user_id, "Listing deleted");
        self.bus.publish(
            CatalogEvent::new("listing.deleted", id, actor.user_id).with_audit(
                AuditRecord::listing(actor.user_id, action_types::LISTING_DELETE, id)
                    .with_values(Some(content_values(&listing)), None)
                    .with_target(listing.owner_id),
            ),
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Workflow
    // -----------------------------------------------------------------------

    async fn transition(
        &self,
        id: DbId,
        actor: Actor,
        transition: Transition,
        reason: Option<&str>,
    ) -> Result<Listing, CoreError> {
        let (before, after) = self.workflow.fire(id, actor, transition, reason).await?;
        self.cache
            .invalidate_listing(id, &[before.slug.as_str(), after.slug.as_str()])
            .await;
        Ok(after)
    }

    pub async fn submit_for_approval(&self, id: DbId, actor: Actor) -> Result<Listing, CoreError> {
        self.transition(id, actor, Transition::Submit, None).await
    }

    pub async fn approve(&self, id: DbId, admin: Actor) -> Result<Listing, CoreError> {
        self.transition(id, admin, Transition::Approve, None).await
    }

    pub async fn reject(&self, id: DbId, admin: Actor, reason: &str) -> Result<Listing, CoreError> {
        self.transition(id, admin, Transition::Reject, Some(reason))
            .await
    }

    pub async fn request_revision(
        &self,
        id: DbId,
        admin: Actor,
        reason: &str,
    ) -> Result<Listing, CoreError> {
        self.transition(id, admin, Transition::RequestRevision, Some(reason))
            .await
    }

    pub async fn withdraw(&self, id: DbId, actor: Actor) -> Result<Listing, CoreError> {
        self.transition(id, actor, Transition::Withdraw, None).await
    }

    pub async fn mark_sold(&self, id: DbId, actor: Actor) -> Result<Listing, CoreError> {
        self.transition(id, actor, Transition::MarkSold, None).await
    }

    pub async fn mark_rented(&self, id: DbId, actor: Actor) -> Result<Listing, CoreError> {
        self.transition(id, actor, Transition::MarkRented, None).await
    }

    // -----------------------------------------------------------------------
    // Featuring
    // -----------------------------------------------------------------------

    /// Feature an approved listing for `days` days from now.
    pub async fn feature(&self, id: DbId, admin: Actor, days: i64) -> Result<Listing, CoreError> {
        admin.require_admin()?;
        if !FEATURE_DAYS.contains(&days) {
            return Err(CoreError::Validation(format!(
                "Featuring must last between {} and {} days",
                FEATURE_DAYS.start(),
                FEATURE_DAYS.end()
            )));
        }
        let listing = self.load_live(id).await?;
        if listing.status != ListingStatus::Approved {
            return Err(CoreError::InvalidTransition {
                action: "feature",
                from: listing.status,
            });
        }

        let until = Utc::now() + Duration::days(days);
        let after = self
            .store
            .set_featured_until(id, Some(until))
            .await?
            .ok_or_else(|| CoreError::not_found("listing", id))?;
        self.after_featuring(&listing, &after, admin, action_types::LISTING_FEATURE)
            .await;
        tracing::info!(listing_id = id, days, "Listing featured");
        Ok(after)
    }

    pub async fn unfeature(&self, id: DbId, admin: Actor) -> Result<Listing, CoreError> {
        admin.require_admin()?;
        let listing = self.load_live(id).await?;
        let after = self
            .store
            .set_featured_until(id, None)
            .await?
            .ok_or_else(|| CoreError::not_found("listing", id))?;
        self.after_featuring(&listing, &after, admin, action_types::LISTING_UNFEATURE)
            .await;
        tracing::info!(listing_id = id, "Listing unfeatured");
        Ok(after)
    }

    async fn after_featuring(&self, before: &Listing, after: &Listing, admin: Actor, action: &str) {
        self.cache
            .invalidate_listing(after.id, &[after.slug.as_str()])
            .await;
        self.cache.delete_pattern(keys::FEATURED_PATTERN).await;
        let event_type = if after.featured_until.is_some() {
            "listing.featured"
        } else {
            "listing.unfeatured"
        };
        self.bus.publish(
            CatalogEvent::new(event_type, after.id, admin.user_id).with_audit(
                AuditRecord::listing(admin.user_id, action, after.id)
                    .with_values(
                        Some(serde_json::json!({ "featured_until": before.featured_until })),
                        Some(serde_json::json!({ "featured_until": after.featured_until })),
                    )
                    .with_target(after.owner_id),
            ),
        );
    }

    // -----------------------------------------------------------------------
    // Engagement and health
    // -----------------------------------------------------------------------

    /// Count a view. Never fails; see [`ViewDeduplicator::record`].
    pub async fn record_view(&self, id: DbId, viewer: &ViewerIdentity) -> ViewOutcome {
        let outcome = self.views.record(id, viewer, Utc::now()).await;
        tracing::debug!(listing_id = id, ?outcome, "View recorded");
        outcome
    }

    pub async fn health(&self) -> HealthReport {
        let store_healthy = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Store health check failed");
                false
            }
        };
        HealthReport {
            store_healthy,
            cache_healthy: self.cache.is_healthy().await,
        }
    }
}

/// Moderated and descriptive fields, as written to update audit entries.
fn content_values(listing: &Listing) -> serde_json::Value {
    serde_json::json!({
        "slug": listing.slug,
        "title": listing.title,
        "description": listing.description,
        "property_type": listing.property_type,
        "transaction_kind": listing.transaction_kind,
        "price": listing.price,
        "currency": listing.currency,
        "address": listing.address,
        "city": listing.city,
        "province": listing.province,
        "bedrooms": listing.bedrooms,
        "bathrooms": listing.bathrooms,
        "floor_area": listing.floor_area,
        "features": listing.features,
        "status": listing.status,
    })
}
