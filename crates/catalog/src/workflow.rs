//! Drives the listing state machine against the store and event bus.

use std::sync::Arc;

use chrono::Utc;
use estate_core::audit::AuditRecord;
use estate_core::error::CoreError;
use estate_core::listing::{Listing, ListingChanges};
use estate_core::notification::NotificationMessage;
use estate_core::ports::CatalogStore;
use estate_core::roles::Actor;
use estate_core::types::DbId;
use estate_core::workflow::{next_status, StateChange, StatusSnapshot, Transition};
use estate_events::{CatalogEvent, EventBus, Recipient};

/// Event name published for a transition.
pub fn event_type(transition: Transition) -> &'static str {
    match transition {
        Transition::Submit => "listing.submitted",
        Transition::Approve => "listing.approved",
        Transition::Reject => "listing.rejected",
        Transition::RequestRevision => "listing.revision_requested",
        Transition::SignificantEdit => "listing.requeued",
        Transition::Withdraw => "listing.withdrawn",
        Transition::MarkSold => "listing.sold",
        Transition::MarkRented => "listing.rented",
    }
}

/// The event for a completed transition: an audit record with both status
/// snapshots, and the notification the transition calls for, if any.
pub fn transition_event(
    transition: Transition,
    before: &Listing,
    after: &Listing,
    actor: Actor,
) -> CatalogEvent {
    let audit = AuditRecord::listing(actor.user_id, transition.audit_action(), after.id)
        .with_values(
            serde_json::to_value(StatusSnapshot::of(before)).ok(),
            serde_json::to_value(StatusSnapshot::of(after)).ok(),
        )
        .with_target(after.owner_id);

    let event = CatalogEvent::new(event_type(transition), after.id, actor.user_id).with_audit(audit);
    let reason = after.rejection_reason.as_deref().unwrap_or_default();
    match transition {
        Transition::Submit | Transition::SignificantEdit => {
            event.with_notification(Recipient::Admins, NotificationMessage::submitted(after))
        }
        Transition::Approve => event.with_notification(
            Recipient::User(after.owner_id),
            NotificationMessage::approved(after),
        ),
        Transition::Reject => event.with_notification(
            Recipient::User(after.owner_id),
            NotificationMessage::rejected(after, reason),
        ),
        Transition::RequestRevision => event.with_notification(
            Recipient::User(after.owner_id),
            NotificationMessage::revision_requested(after, reason),
        ),
        Transition::Withdraw | Transition::MarkSold | Transition::MarkRented => event,
    }
}

pub struct ApprovalWorkflow {
    store: Arc<dyn CatalogStore>,
    bus: Arc<EventBus>,
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<dyn CatalogStore>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Fire `transition` on listing `id` as `actor`.
    ///
    /// Every precondition (existence, role, ownership, source status,
    /// submission completeness, reason) is checked before the single state
    /// write. Returns the listing before and after the write.
    pub async fn fire(
        &self,
        id: DbId,
        actor: Actor,
        transition: Transition,
        reason: Option<&str>,
    ) -> Result<(Listing, Listing), CoreError> {
        let before = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("listing", id))?;

        if transition.is_moderation() {
            actor.require_admin()?;
        } else {
            actor.authorize(&before, transition.admin_override())?;
        }
        next_status(before.status, transition)?;

        if transition == Transition::Submit {
            self.ensure_submittable(&before).await?;
        }

        let change = StateChange::for_transition(transition, actor.user_id, reason, Utc::now())?;
        let after = self
            .store
            .update(id, &ListingChanges::state_only(change))
            .await?
            .ok_or_else(|| CoreError::not_found("listing", id))?;

        tracing::info!(
            listing_id = id,
            actor_id = actor.user_id,
            from = %before.status,
            to = %after.status,
            "Listing transitioned"
        );
        self.bus
            .publish(transition_event(transition, &before, &after, actor));
        Ok((before, after))
    }

    /// Completeness and image preconditions of a submission.
    pub async fn ensure_submittable(&self, listing: &Listing) -> Result<(), CoreError> {
        let missing = listing.missing_for_submission();
        if !missing.is_empty() {
            return Err(CoreError::IncompleteProperty { missing });
        }
        if self.store.image_count(listing.id).await? == 0 {
            return Err(CoreError::NoImages);
        }
        Ok(())
    }
}
