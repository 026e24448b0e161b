//! Service-level behaviour of the catalog over the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{
    harness, harness_over, new_listing, seeded_store, RacingStore, ADMIN, AGENT, OWNER, STRANGER,
};
use estate_catalog::views::ViewDeduplicator;
use estate_catalog::{MemoryAuditSink, MemoryNotifier};
use estate_core::error::CoreError;
use estate_core::listing::{ListingPatch, NewListing, NewListingImage};
use estate_core::notification::kinds;
use estate_core::ports::{CatalogStore, ListingStore};
use estate_core::quota::Subscription;
use estate_core::roles::{Actor, Role};
use estate_core::search::{ListingQuery, SortField, SortOrder};
use estate_core::status::{is_valid_pair, ApprovalStatus, ListingStatus};
use estate_core::views::{ViewOutcome, ViewerIdentity};
use estate_events::{AuditDispatcher, NotificationDispatcher, Recipient, RetryPolicy};

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn same_title_gets_numeric_suffix() {
    let h = harness();
    let first = h.draft(new_listing("Modern Family House, 4 Bed")).await;
    let second = h.draft(new_listing("Modern Family House, 4 Bed")).await;
    let third = h.draft(new_listing("Modern Family House, 4 Bed")).await;

    assert_eq!(first.slug, "modern-family-house-4-bed");
    assert_eq!(second.slug, "modern-family-house-4-bed-1");
    assert_eq!(third.slug, "modern-family-house-4-bed-2");
}

#[tokio::test]
async fn retitling_moves_the_slug_and_frees_the_old_key() {
    let h = harness();
    let listing = h.approved(new_listing("Cozy Loft")).await;
    let taken = h.draft(new_listing("Garden Cottage")).await;

    // Warm the detail cache under the old slug.
    h.service.get_by_id_or_slug("cozy-loft", None).await.unwrap();

    let patch = ListingPatch {
        title: Some("Garden Cottage".into()),
        ..Default::default()
    };
    let updated = h.service.update(listing.id, patch, OWNER).await.unwrap();

    assert_eq!(updated.listing.slug, "garden-cottage-1");
    assert_ne!(updated.listing.slug, taken.slug);
    assert_matches!(
        h.service.get_by_id_or_slug("cozy-loft", None).await,
        Err(CoreError::NotFound { .. })
    );
    let by_new = h
        .service
        .get_by_id_or_slug("garden-cottage-1", None)
        .await
        .unwrap();
    assert_eq!(by_new.listing.id, listing.id);
}

#[tokio::test]
async fn keeping_the_title_keeps_the_slug() {
    let h = harness();
    let listing = h.draft(new_listing("Cozy Loft")).await;
    let patch = ListingPatch {
        title: Some("  Cozy Loft ".into()),
        ..Default::default()
    };
    let updated = h.service.update(listing.id, patch, OWNER).await.unwrap();
    assert_eq!(updated.listing.slug, "cozy-loft");
}

#[tokio::test]
async fn create_reallocates_after_losing_a_slug_race() {
    let memory = seeded_store();
    let racing = Arc::new(RacingStore::new(memory.clone()));
    let h = harness_over(memory, racing.clone());

    racing.lose_next(1);
    let listing = h.draft(new_listing("Harbour View")).await;

    assert_eq!(listing.slug, "harbour-view-1");
    let competitor = h.store.find_by_slug("harbour-view").await.unwrap().unwrap();
    assert_eq!(competitor.owner_id, STRANGER.user_id);
}

#[tokio::test]
async fn create_gives_up_after_three_lost_slug_races() {
    let memory = seeded_store();
    let racing = Arc::new(RacingStore::new(memory.clone()));
    let mut h = harness_over(memory, racing.clone());

    racing.lose_next(3);
    assert_matches!(
        h.service.create(new_listing("Harbour View"), OWNER).await,
        Err(CoreError::Internal(_))
    );
    assert_eq!(h.store.count_active_for_owner(OWNER.user_id).await.unwrap(), 0);
    assert!(h.drain_events().is_empty());

    // Two losses still fit inside the attempt budget.
    racing.lose_next(2);
    let listing = h.draft(new_listing("Harbour View")).await;
    assert_eq!(listing.slug, "harbour-view-5");
}

#[tokio::test]
async fn retitle_reallocates_after_losing_a_slug_race() {
    let memory = seeded_store();
    let racing = Arc::new(RacingStore::new(memory.clone()));
    let h = harness_over(memory, racing.clone());
    let listing = h.draft(new_listing("Cozy Loft")).await;

    racing.lose_next(1);
    let patch = ListingPatch {
        title: Some("Harbour View".into()),
        ..Default::default()
    };
    let updated = h.service.update(listing.id, patch, OWNER).await.unwrap();

    assert_eq!(updated.listing.slug, "harbour-view-1");
    assert_eq!(updated.listing.title, "Harbour View");
}

// ---------------------------------------------------------------------------
// Write atomicity
// ---------------------------------------------------------------------------

fn new_images() -> Vec<NewListingImage> {
    vec![NewListingImage {
        url: "https://img.example.com/new.jpg".into(),
        caption: None,
    }]
}

#[tokio::test]
async fn failed_image_write_rolls_back_the_whole_update() {
    let mut h = harness();
    let listing = h.approved(new_listing("Lake House")).await;
    h.service
        .get_by_id_or_slug(&listing.id.to_string(), None)
        .await
        .unwrap();
    h.drain_events();

    h.store.set_image_writes_failing(true);
    let patch = ListingPatch {
        description: Some("NEW".into()),
        images: Some(new_images()),
        ..Default::default()
    };
    assert_matches!(
        h.service.update(listing.id, patch, OWNER).await,
        Err(CoreError::StoreUnavailable(_))
    );

    let stored = h.store.raw_listing(listing.id).unwrap();
    assert_eq!(stored.description.as_deref(), Some("Bright and spacious"));
    assert_eq!(stored.status, ListingStatus::Approved);
    let detail = h
        .service
        .get_by_id_or_slug(&listing.id.to_string(), None)
        .await
        .unwrap();
    assert_eq!(detail.listing.description, stored.description);
    assert_eq!(detail.images[0].url, "https://img.example.com/front.jpg");
    assert!(h.drain_events().is_empty());

    h.store.set_image_writes_failing(false);
    let patch = ListingPatch {
        description: Some("NEW".into()),
        images: Some(new_images()),
        ..Default::default()
    };
    let updated = h.service.update(listing.id, patch, OWNER).await.unwrap();
    assert_eq!(updated.listing.description.as_deref(), Some("NEW"));
    assert_eq!(updated.images[0].url, "https://img.example.com/new.jpg");
}

#[tokio::test]
async fn failed_image_write_leaves_no_submitted_listing_behind() {
    let mut h = harness();
    h.store.set_image_writes_failing(true);

    let input = NewListing {
        submit: true,
        ..new_listing("Hillside Villa")
    };
    assert_matches!(
        h.service.create(input, OWNER).await,
        Err(CoreError::StoreUnavailable(_))
    );

    assert_eq!(h.store.count_active_for_owner(OWNER.user_id).await.unwrap(), 0);
    assert!(h.store.find_by_slug("hillside-villa").await.unwrap().is_none());
    assert!(h.drain_events().is_empty());
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn incomplete_submission_then_fix_and_resubmit() {
    let mut h = harness();
    let draft = h
        .draft(NewListing {
            price: None,
            images: vec![],
            ..new_listing("Riverside Flat")
        })
        .await;

    let err = h.service.submit_for_approval(draft.id, OWNER).await.unwrap_err();
    assert_matches!(err, CoreError::IncompleteProperty { ref missing } if missing == &vec!["price"]);

    let patch = ListingPatch {
        price: Some(320_000),
        ..Default::default()
    };
    h.service.update(draft.id, patch, OWNER).await.unwrap();
    assert_matches!(
        h.service.submit_for_approval(draft.id, OWNER).await,
        Err(CoreError::NoImages)
    );

    let patch = ListingPatch {
        images: Some(vec![NewListingImage {
            url: "https://img.example.com/river.jpg".into(),
            caption: None,
        }]),
        ..Default::default()
    };
    h.service.update(draft.id, patch, OWNER).await.unwrap();
    h.drain_events();

    let submitted = h.service.submit_for_approval(draft.id, OWNER).await.unwrap();
    assert_eq!(submitted.status, ListingStatus::PendingApproval);
    assert_eq!(submitted.approval_status, ApprovalStatus::Pending);

    let events = h.drain_events();
    assert_eq!(events.len(), 1);
    let target = events[0].notification.clone().unwrap();
    assert_eq!(target.recipient, Recipient::Admins);
    assert_eq!(target.message.kind, kinds::LISTING_SUBMITTED);
    assert_eq!(events[0].audit.as_ref().unwrap().action, "listing_submit");
}

#[tokio::test]
async fn create_and_submit_checks_preconditions_before_writing() {
    let h = harness();
    let err = h
        .service
        .create(
            NewListing {
                submit: true,
                description: None,
                city: None,
                ..new_listing("Half Done")
            },
            OWNER,
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::IncompleteProperty { ref missing } if missing == &vec!["description", "city"]);

    let err = h
        .service
        .create(
            NewListing {
                submit: true,
                images: vec![],
                ..new_listing("Half Done")
            },
            OWNER,
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NoImages);
    assert!(h.store.raw_listing(1).is_none());
}

#[tokio::test]
async fn moderation_sets_approval_fields_and_notifies_owner() {
    let mut h = harness();
    let listing = h.approved(new_listing("Sunny Bungalow")).await;

    assert_eq!(listing.status, ListingStatus::Approved);
    assert_eq!(listing.approved_by, Some(ADMIN.user_id));
    assert!(listing.approved_at.is_some());
    assert!(listing.published_at.is_some());

    let approved = h
        .drain_events()
        .into_iter()
        .find(|e| e.event_type == "listing.approved")
        .unwrap();
    let target = approved.notification.unwrap();
    assert_eq!(target.recipient, Recipient::User(OWNER.user_id));
    assert_eq!(target.message.kind, kinds::LISTING_APPROVED);
}

#[tokio::test]
async fn reject_and_revision_require_admin_and_reason() {
    let h = harness();
    let pending = h
        .draft(NewListing {
            submit: true,
            ..new_listing("Pending Villa")
        })
        .await;

    assert_matches!(
        h.service.reject(pending.id, OWNER, "nope").await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.service.request_revision(pending.id, ADMIN, "  ").await,
        Err(CoreError::Validation(_))
    );

    let revised = h
        .service
        .request_revision(pending.id, ADMIN, "Add floor plan")
        .await
        .unwrap();
    assert_eq!(revised.status, ListingStatus::RevisionRequested);
    assert_eq!(revised.rejection_reason.as_deref(), Some("Add floor plan"));

    let resubmitted = h.service.submit_for_approval(pending.id, OWNER).await.unwrap();
    assert_eq!(resubmitted.rejection_reason, None);

    let rejected = h
        .service
        .reject(pending.id, ADMIN, "Duplicate listing")
        .await
        .unwrap();
    assert_eq!(rejected.status, ListingStatus::Rejected);
    assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);
}

#[tokio::test]
async fn transitions_from_wrong_state_are_conflicts() {
    let h = harness();
    let draft = h.draft(new_listing("Draft House")).await;

    assert_matches!(
        h.service.approve(draft.id, ADMIN).await,
        Err(CoreError::InvalidTransition { action: "approve", from: ListingStatus::Draft })
    );
    assert_matches!(
        h.service.withdraw(draft.id, OWNER).await,
        Err(CoreError::InvalidTransition { .. })
    );
    assert_matches!(
        h.service.approve(9_999, ADMIN).await,
        Err(CoreError::NotFound { .. })
    );
}

#[tokio::test]
async fn ownership_rules_for_withdraw_and_terminal_transitions() {
    let h = harness();
    let listing = h
        .approved(NewListing {
            agent_id: Some(AGENT.user_id),
            ..new_listing("Agent Managed")
        })
        .await;

    assert_matches!(
        h.service.withdraw(listing.id, STRANGER).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.service.mark_sold(listing.id, ADMIN).await,
        Err(CoreError::Forbidden(_))
    );
    let sold = h.service.mark_sold(listing.id, AGENT).await.unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert_eq!(sold.approval_status, ApprovalStatus::Approved);

    let other = h.approved(new_listing("Admin Withdraws")).await;
    let withdrawn = h.service.withdraw(other.id, ADMIN).await.unwrap();
    assert_eq!(withdrawn.status, ListingStatus::Withdrawn);

    let rental = h.approved(new_listing("Rental")).await;
    let rented = h.service.mark_rented(rental.id, OWNER).await.unwrap();
    assert_eq!(rented.status, ListingStatus::Rented);
}

#[tokio::test]
async fn status_pairing_holds_across_the_lifecycle() {
    let h = harness();
    let listing = h.draft(new_listing("Lifecycle")).await;
    let mut seen = vec![listing.clone()];
    seen.push(h.service.submit_for_approval(listing.id, OWNER).await.unwrap());
    seen.push(h.service.request_revision(listing.id, ADMIN, "Fix").await.unwrap());
    seen.push(h.service.submit_for_approval(listing.id, OWNER).await.unwrap());
    seen.push(h.service.approve(listing.id, ADMIN).await.unwrap());
    seen.push(h.service.withdraw(listing.id, OWNER).await.unwrap());

    for l in seen {
        assert!(
            is_valid_pair(l.status, l.approval_status),
            "{} paired with {}",
            l.status,
            l.approval_status
        );
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn price_change_on_approved_listing_requeues() {
    let mut h = harness();
    let listing = h.approved(new_listing("Requeue Me")).await;
    h.drain_events();

    let patch = ListingPatch {
        price: Some(475_000),
        ..Default::default()
    };
    let updated = h.service.update(listing.id, patch, OWNER).await.unwrap();

    assert_eq!(updated.listing.status, ListingStatus::PendingApproval);
    assert_eq!(updated.listing.approval_status, ApprovalStatus::Pending);
    assert_eq!(updated.listing.published_at, listing.published_at);

    let events = h.drain_events();
    let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["listing.updated", "listing.requeued"]);
    assert_eq!(
        events[1].notification.as_ref().unwrap().recipient,
        Recipient::Admins
    );
}

#[tokio::test]
async fn description_only_change_keeps_approval() {
    let h = harness();
    let listing = h.approved(new_listing("Stay Approved")).await;

    let patch = ListingPatch {
        description: Some("Now with a renovated kitchen".into()),
        features: Some(vec!["Pool".into()]),
        price: Some(450_000),
        ..Default::default()
    };
    let updated = h.service.update(listing.id, patch, OWNER).await.unwrap();

    assert_eq!(updated.listing.status, ListingStatus::Approved);
    assert_eq!(updated.listing.features, vec!["pool"]);
}

#[tokio::test]
async fn update_is_visible_through_the_detail_cache() {
    let h = harness();
    let listing = h.approved(new_listing("Cached House")).await;

    let before = h
        .service
        .get_by_id_or_slug(&listing.id.to_string(), None)
        .await
        .unwrap();
    assert_eq!(before.listing.description.as_deref(), Some("Bright and spacious"));
    assert!(!h.cache.is_empty());

    let patch = ListingPatch {
        description: Some("Freshly painted".into()),
        ..Default::default()
    };
    h.service.update(listing.id, patch, OWNER).await.unwrap();

    let by_id = h
        .service
        .get_by_id_or_slug(&listing.id.to_string(), None)
        .await
        .unwrap();
    let by_slug = h
        .service
        .get_by_id_or_slug(&listing.slug, None)
        .await
        .unwrap();
    assert_eq!(by_id.listing.description.as_deref(), Some("Freshly painted"));
    assert_eq!(by_slug.listing.description.as_deref(), Some("Freshly painted"));
}

#[tokio::test]
async fn strangers_cannot_update() {
    let h = harness();
    let listing = h.draft(new_listing("Private")).await;
    let patch = ListingPatch {
        price: Some(1),
        ..Default::default()
    };
    assert_matches!(
        h.service.update(listing.id, patch.clone(), STRANGER).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.service.update(listing.id, patch, ADMIN).await,
        Err(CoreError::Forbidden(_))
    );
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn soft_delete_hides_listing_and_blocks_terminal_states() {
    let h = harness();
    let listing = h.approved(new_listing("Delete Me")).await;
    h.service
        .get_by_id_or_slug("delete-me", None)
        .await
        .unwrap();

    assert_matches!(
        h.service.delete(listing.id, STRANGER).await,
        Err(CoreError::Forbidden(_))
    );
    h.service.delete(listing.id, ADMIN).await.unwrap();

    assert!(h.store.raw_listing(listing.id).unwrap().deleted_at.is_some());
    assert_matches!(
        h.service.get_by_id_or_slug("delete-me", None).await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        h.service.delete(listing.id, OWNER).await,
        Err(CoreError::NotFound { .. })
    );

    let sold = h.approved(new_listing("Sold Already")).await;
    h.service.mark_sold(sold.id, OWNER).await.unwrap();
    assert_matches!(
        h.service.delete(sold.id, OWNER).await,
        Err(CoreError::InvalidTransition { action: "delete", .. })
    );
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sixth_listing_exceeds_a_five_listing_subscription() {
    let h = harness();
    let owner = Actor::new(20, Role::Member);
    h.store.set_subscription(Subscription {
        user_id: owner.user_id,
        tier: "basic".into(),
        max_listings: Some(5),
    });

    for n in 0..5 {
        h.service
            .create(new_listing(&format!("Unit {n}")), owner)
            .await
            .unwrap();
    }
    let err = h
        .service
        .create(new_listing("Unit 5"), owner)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::ListingLimitReached { limit: 5, .. });
    assert_eq!(h.store.count_active_for_owner(owner.user_id).await.unwrap(), 5);
}

#[tokio::test]
async fn default_tier_applies_without_subscription_and_terminal_listings_free_slots() {
    let h = harness();
    let owner = Actor::new(30, Role::Member);

    let mut ids = Vec::new();
    for n in 0..3 {
        let detail = h
            .service
            .create(
                NewListing {
                    submit: true,
                    ..new_listing(&format!("Free {n}"))
                },
                owner,
            )
            .await
            .unwrap();
        ids.push(detail.listing.id);
    }
    assert_matches!(
        h.service.create(new_listing("Free 3"), owner).await,
        Err(CoreError::ListingLimitReached { ref tier, limit: 3 }) if tier == "free"
    );

    h.service.approve(ids[0], ADMIN).await.unwrap();
    h.service.mark_sold(ids[0], owner).await.unwrap();
    h.service.create(new_listing("Free 3"), owner).await.unwrap();
}

// ---------------------------------------------------------------------------
// Search and detail visibility
// ---------------------------------------------------------------------------

#[tokio::test]
async fn anonymous_search_only_returns_approved() {
    let h = harness();
    h.draft(new_listing("Hidden Draft")).await;
    let public = h.approved(new_listing("Public House")).await;

    let query = ListingQuery {
        status: Some(ListingStatus::Draft),
        ..Default::default()
    };
    let result = h.service.search(&query, None).await.unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].id, public.id);
    assert_eq!(result.pagination.total, 1);
}

#[tokio::test]
async fn members_see_own_drafts_and_admins_see_all() {
    let h = harness();
    let draft = h.draft(new_listing("Owner Draft")).await;
    h.approved(new_listing("Public One")).await;
    let query = ListingQuery {
        status: Some(ListingStatus::Draft),
        ..Default::default()
    };

    let own = h.service.search(&query, Some(OWNER)).await.unwrap();
    assert_eq!(own.items.iter().map(|s| s.id).collect::<Vec<_>>(), vec![draft.id]);

    let stranger = h.service.search(&query, Some(STRANGER)).await.unwrap();
    assert!(stranger.items.is_empty());

    let all = h
        .service
        .search(&ListingQuery::default(), Some(ADMIN))
        .await
        .unwrap();
    assert_eq!(all.pagination.total, 2);
}

#[tokio::test]
async fn price_range_sorted_ascending() {
    let h = harness();
    for (title, price) in [
        ("Cheap", 250_000),
        ("Mid A", 650_000),
        ("Mid B", 300_000),
        ("Mid C", 700_000),
        ("Pricey", 900_000),
    ] {
        h.approved(NewListing {
            price: Some(price),
            ..new_listing(title)
        })
        .await;
    }

    let query = ListingQuery {
        min_price: Some(300_000),
        max_price: Some(700_000),
        sort_by: Some(SortField::Price),
        sort_order: Some(SortOrder::Asc),
        ..Default::default()
    };
    let result = h.service.search(&query, None).await.unwrap();

    let prices: Vec<_> = result.items.iter().map(|s| s.price.unwrap()).collect();
    assert_eq!(prices, vec![300_000, 650_000, 700_000]);
    assert_eq!(result.pagination.limit, 20);
    assert_eq!(result.pagination.total_pages, 1);
    assert!(!result.pagination.has_more);
}

#[tokio::test]
async fn paging_reports_totals() {
    let h = harness();
    for n in 0..5 {
        h.approved(new_listing(&format!("Page House {n}"))).await;
    }
    let query = ListingQuery {
        page: Some(2),
        limit: Some(2),
        ..Default::default()
    };
    let result = h.service.search(&query, None).await.unwrap();
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.pagination.total, 5);
    assert_eq!(result.pagination.total_pages, 3);
    assert!(result.pagination.has_more);

    let empty = h
        .service
        .search(
            &ListingQuery {
                q: Some("no such words".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert!(empty.items.is_empty());
    assert_eq!(empty.pagination.total_pages, 0);
}

#[tokio::test]
async fn text_and_feature_filters() {
    let h = harness();
    let pool = h
        .approved(NewListing {
            features: vec!["Pool".into(), "Garage".into()],
            description: Some("Lakeside retreat".into()),
            ..new_listing("Retreat")
        })
        .await;
    h.approved(NewListing {
        features: vec!["Pool".into()],
        ..new_listing("Pool Only")
    })
    .await;

    let query = ListingQuery {
        features: Some("garage, POOL".into()),
        ..Default::default()
    };
    let result = h.service.search(&query, None).await.unwrap();
    assert_eq!(result.items.iter().map(|s| s.id).collect::<Vec<_>>(), vec![pool.id]);

    let query = ListingQuery {
        q: Some("LAKESIDE".into()),
        ..Default::default()
    };
    let result = h.service.search(&query, None).await.unwrap();
    assert_eq!(result.items.len(), 1);
}

#[tokio::test]
async fn radius_search_drops_far_and_unplaced_listings() {
    let h = harness();
    let near = h
        .approved(NewListing {
            latitude: Some(45.52),
            longitude: Some(-122.68),
            ..new_listing("Near")
        })
        .await;
    h.approved(NewListing {
        latitude: Some(47.61),
        longitude: Some(-122.33),
        ..new_listing("Far")
    })
    .await;
    h.approved(new_listing("Unplaced")).await;

    let query = ListingQuery {
        lat: Some(45.5),
        lng: Some(-122.6),
        radius_km: Some(15.0),
        ..Default::default()
    };
    let result = h.service.search(&query, None).await.unwrap();
    assert_eq!(result.items.iter().map(|s| s.id).collect::<Vec<_>>(), vec![near.id]);
}

#[tokio::test]
async fn unapproved_detail_is_hidden_from_the_public() {
    let h = harness();
    let draft = h
        .draft(NewListing {
            agent_id: Some(AGENT.user_id),
            ..new_listing("Secret Draft")
        })
        .await;
    h.store.add_inquiry(draft.id, "Pat", "Is it available?");

    assert_matches!(
        h.service.get_by_id_or_slug("secret-draft", None).await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        h.service.get_by_id_or_slug("secret-draft", Some(STRANGER)).await,
        Err(CoreError::NotFound { .. })
    );

    let owner_view = h
        .service
        .get_by_id_or_slug("secret-draft", Some(OWNER))
        .await
        .unwrap();
    assert_eq!(owner_view.recent_inquiries.len(), 1);
    assert_eq!(owner_view.owner.unwrap().name, "Olive Owner");
    assert_eq!(owner_view.agent.unwrap().name, "Andy Agent");
    assert_eq!(owner_view.images.len(), 1);

    let admin_view = h
        .service
        .get_by_id_or_slug(&draft.id.to_string(), Some(ADMIN))
        .await
        .unwrap();
    assert!(admin_view.recent_inquiries.is_empty());
}

#[tokio::test]
async fn inquiries_are_not_leaked_through_the_cache() {
    let h = harness();
    let listing = h.approved(new_listing("Busy House")).await;
    h.store.add_inquiry(listing.id, "Sam", "Viewing on Saturday?");

    let owner_view = h
        .service
        .get_by_id_or_slug("busy-house", Some(OWNER))
        .await
        .unwrap();
    assert_eq!(owner_view.recent_inquiries.len(), 1);

    let public_view = h.service.get_by_id_or_slug("busy-house", None).await.unwrap();
    assert!(public_view.recent_inquiries.is_empty());
}

// ---------------------------------------------------------------------------
// Featuring
// ---------------------------------------------------------------------------

#[tokio::test]
async fn featuring_controls_the_featured_list() {
    let h = harness();
    let listing = h.approved(new_listing("Star House")).await;
    let draft = h.draft(new_listing("Not Yet")).await;

    assert!(h.service.get_featured(None).await.unwrap().is_empty());

    assert_matches!(
        h.service.feature(listing.id, ADMIN, 0).await,
        Err(CoreError::Validation(_))
    );
    assert_matches!(
        h.service.feature(listing.id, OWNER, 7).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.service.feature(draft.id, ADMIN, 7).await,
        Err(CoreError::InvalidTransition { action: "feature", .. })
    );

    let featured = h.service.feature(listing.id, ADMIN, 7).await.unwrap();
    assert!(featured.featured_until.unwrap() > Utc::now());
    let list = h.service.get_featured(None).await.unwrap();
    assert_eq!(list.len(), 1);
    assert!(list[0].is_featured);

    h.service.unfeature(listing.id, ADMIN).await.unwrap();
    assert!(h.service.get_featured(None).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeat_views_within_an_hour_count_once() {
    let h = harness();
    let listing = h.approved(new_listing("Viewed")).await;
    let session = ViewerIdentity::Session("sess-abc".into());

    assert_eq!(h.service.record_view(listing.id, &session).await, ViewOutcome::Recorded);
    assert_eq!(
        h.service.record_view(listing.id, &session).await,
        ViewOutcome::Deduplicated
    );
    assert_eq!(
        h.service
            .record_view(listing.id, &ViewerIdentity::User(STRANGER.user_id))
            .await,
        ViewOutcome::Recorded
    );

    let stored = h.store.raw_listing(listing.id).unwrap();
    assert_eq!(stored.view_count, 2);
    assert_eq!(h.store.view_events(listing.id), 2);
}

#[tokio::test]
async fn simultaneous_views_from_one_session_count_once() {
    let h = harness();
    let listing = h.approved(new_listing("Busy")).await;
    let session = ViewerIdentity::Session("tab".into());

    let (first, second) = tokio::join!(
        h.service.record_view(listing.id, &session),
        h.service.record_view(listing.id, &session),
    );

    let mut outcomes = vec![first, second];
    outcomes.sort_by_key(|o| *o == ViewOutcome::Deduplicated);
    assert_eq!(outcomes, vec![ViewOutcome::Recorded, ViewOutcome::Deduplicated]);
    assert_eq!(h.store.raw_listing(listing.id).unwrap().view_count, 1);
    assert_eq!(h.store.view_events(listing.id), 1);
}

#[tokio::test]
async fn views_count_again_after_the_window() {
    let h = harness();
    let listing = h.approved(new_listing("Window")).await;
    let dedup = ViewDeduplicator::new(h.store.clone() as Arc<dyn CatalogStore>);
    let viewer = ViewerIdentity::User(STRANGER.user_id);
    let start = Utc::now();

    assert_eq!(dedup.record(listing.id, &viewer, start).await, ViewOutcome::Recorded);
    assert_eq!(
        dedup
            .record(listing.id, &viewer, start + chrono::Duration::minutes(59))
            .await,
        ViewOutcome::Deduplicated
    );
    assert_eq!(
        dedup
            .record(listing.id, &viewer, start + chrono::Duration::minutes(61))
            .await,
        ViewOutcome::Recorded
    );
    assert_eq!(h.store.raw_listing(listing.id).unwrap().view_count, 2);
}

#[tokio::test]
async fn view_tracking_never_fails_the_caller() {
    let h = harness();
    let listing = h.approved(new_listing("Fragile")).await;
    let viewer = ViewerIdentity::Session("s".into());

    assert_eq!(h.service.record_view(9_999, &viewer).await, ViewOutcome::Skipped);

    h.store.set_unavailable(true);
    assert_eq!(h.service.record_view(listing.id, &viewer).await, ViewOutcome::Skipped);
    h.store.set_unavailable(false);
    assert_eq!(h.store.raw_listing(listing.id).unwrap().view_count, 0);
}

// ---------------------------------------------------------------------------
// Failure handling and side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_outage_surfaces_as_unavailable() {
    let h = harness();
    h.store.set_unavailable(true);

    assert_matches!(
        h.service.search(&ListingQuery::default(), None).await,
        Err(CoreError::StoreUnavailable(_))
    );
    assert_matches!(
        h.service.create(new_listing("Offline"), OWNER).await,
        Err(CoreError::StoreUnavailable(_))
    );
    let health = h.service.health().await;
    assert!(!health.store_healthy);
    assert!(health.cache_healthy);
}

#[tokio::test]
async fn dispatchers_deliver_audit_and_notifications() {
    let h = harness();
    let audit = Arc::new(MemoryAuditSink::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let policy = RetryPolicy {
        initial_delay: Duration::from_millis(1),
        ..RetryPolicy::default()
    };
    tokio::spawn(AuditDispatcher::run(audit.clone(), h.bus.subscribe(), policy.clone()));
    tokio::spawn(NotificationDispatcher::run(
        notifier.clone(),
        h.bus.subscribe(),
        policy,
    ));

    let listing = h.approved(new_listing("Dispatched")).await;
    h.service
        .reject(listing.id, ADMIN, "irrelevant")
        .await
        .unwrap_err();

    let expected = vec!["listing_create", "listing_submit", "listing_approve"];
    tokio::time::timeout(Duration::from_secs(5), async {
        while audit.actions_for(listing.id) != expected || notifier.sent().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("side effects should be delivered");

    let sent = notifier.sent();
    assert_eq!(sent[0].0, Recipient::Admins);
    assert_eq!(sent[1].0, Recipient::User(OWNER.user_id));
    assert_eq!(sent[1].1.kind, kinds::LISTING_APPROVED);
}
