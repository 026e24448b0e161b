//! Listing approval state machine.
//!
//! Pure transition rules: which trigger is allowed from which status, where it
//! leads, and what the resulting [`StateChange`] writes. Driving the machine
//! (loading, authorizing, persisting, emitting side effects) happens in the
//! catalog crate.

use serde::Serialize;

use crate::audit::action_types;
use crate::error::CoreError;
use crate::listing::{Listing, ListingPatch};
use crate::status::{ApprovalStatus, ListingStatus};
use crate::types::{DbId, Timestamp};

/// A trigger that moves a listing between workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Approve,
    Reject,
    RequestRevision,
    /// A content edit touching moderated fields on an approved listing.
    SignificantEdit,
    Withdraw,
    MarkSold,
    MarkRented,
}

impl Transition {
    /// Verb used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::RequestRevision => "request revision for",
            Transition::SignificantEdit => "re-queue",
            Transition::Withdraw => "withdraw",
            Transition::MarkSold => "mark as sold",
            Transition::MarkRented => "mark as rented",
        }
    }

    /// Statuses the trigger may fire from.
    pub fn sources(self) -> &'static [ListingStatus] {
        match self {
            Transition::Submit => &[
                ListingStatus::Draft,
                ListingStatus::RevisionRequested,
                ListingStatus::Rejected,
            ],
            Transition::Approve | Transition::Reject | Transition::RequestRevision => {
                &[ListingStatus::PendingApproval]
            }
            Transition::SignificantEdit
            | Transition::Withdraw
            | Transition::MarkSold
            | Transition::MarkRented => &[ListingStatus::Approved],
        }
    }

    pub fn target(self) -> ListingStatus {
        match self {
            Transition::Submit | Transition::SignificantEdit => ListingStatus::PendingApproval,
            Transition::Approve => ListingStatus::Approved,
            Transition::Reject => ListingStatus::Rejected,
            Transition::RequestRevision => ListingStatus::RevisionRequested,
            Transition::Withdraw => ListingStatus::Withdrawn,
            Transition::MarkSold => ListingStatus::Sold,
            Transition::MarkRented => ListingStatus::Rented,
        }
    }

    /// Moderation triggers are reserved to administrators.
    pub fn is_moderation(self) -> bool {
        matches!(
            self,
            Transition::Approve | Transition::Reject | Transition::RequestRevision
        )
    }

    /// Whether an administrator may fire the trigger on a listing they do not
    /// participate in.
    pub fn admin_override(self) -> bool {
        matches!(self, Transition::Withdraw)
    }

    pub fn audit_action(self) -> &'static str {
        match self {
            Transition::Submit => action_types::LISTING_SUBMIT,
            Transition::Approve => action_types::LISTING_APPROVE,
            Transition::Reject => action_types::LISTING_REJECT,
            Transition::RequestRevision => action_types::LISTING_REQUEST_REVISION,
            Transition::SignificantEdit => action_types::LISTING_REQUEUE,
            Transition::Withdraw => action_types::LISTING_WITHDRAW,
            Transition::MarkSold => action_types::LISTING_MARK_SOLD,
            Transition::MarkRented => action_types::LISTING_MARK_RENTED,
        }
    }
}

/// Resolve the status reached by firing `transition` from `from`.
pub fn next_status(from: ListingStatus, transition: Transition) -> Result<ListingStatus, CoreError> {
    if transition.sources().contains(&from) {
        Ok(transition.target())
    } else {
        Err(CoreError::InvalidTransition {
            action: transition.name(),
            from,
        })
    }
}

/// Soft delete is allowed from every non-terminal status.
pub fn ensure_deletable(status: ListingStatus) -> Result<(), CoreError> {
    if status.is_terminal() {
        Err(CoreError::InvalidTransition {
            action: "delete",
            from: status,
        })
    } else {
        Ok(())
    }
}

/// Both status fields, as written to audit snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status: ListingStatus,
    pub approval_status: ApprovalStatus,
}

impl StatusSnapshot {
    pub fn of(listing: &Listing) -> Self {
        Self {
            status: listing.status,
            approval_status: listing.approval_status,
        }
    }
}

/// How a transition treats `rejection_reason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonUpdate {
    Keep,
    Set(String),
    Clear,
}

/// The lifecycle columns a transition writes. `approval_status` is always the
/// one paired with `status`, so an invalid pairing cannot be expressed.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub status: ListingStatus,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: ReasonUpdate,
    /// Set on approval: `(approved_by, approved_at)`.
    pub approval: Option<(DbId, Timestamp)>,
    /// Set on first publication only; later approvals keep the original date.
    pub published_at: Option<Timestamp>,
}

impl StateChange {
    /// Build the write for `transition` fired by `actor_id` at `now`.
    ///
    /// `reason` is required for reject and revision requests and ignored
    /// otherwise.
    pub fn for_transition(
        transition: Transition,
        actor_id: DbId,
        reason: Option<&str>,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        let status = transition.target();
        let rejection_reason = match transition {
            Transition::Reject | Transition::RequestRevision => {
                let reason = reason.map(str::trim).filter(|r| !r.is_empty()).ok_or_else(|| {
                    CoreError::Validation("A reason is required to reject or request revision".into())
                })?;
                ReasonUpdate::Set(reason.to_string())
            }
            Transition::Submit | Transition::Approve | Transition::SignificantEdit => {
                ReasonUpdate::Clear
            }
            Transition::Withdraw | Transition::MarkSold | Transition::MarkRented => {
                ReasonUpdate::Keep
            }
        };
        let (approval, published_at) = if transition == Transition::Approve {
            (Some((actor_id, now)), Some(now))
        } else {
            (None, None)
        };
        Ok(Self {
            status,
            approval_status: status.approval_status(),
            rejection_reason,
            approval,
            published_at,
        })
    }
}

/// Whether `patch` changes a field that invalidates moderation approval.
///
/// Setting a field to the value it already has is not a change.
pub fn is_significant_edit(current: &Listing, patch: &ListingPatch) -> bool {
    fn changed<T: PartialEq>(new: &Option<T>, old: &T) -> bool {
        new.as_ref().is_some_and(|n| n != old)
    }
    fn changed_opt<T: PartialEq>(new: &Option<T>, old: &Option<T>) -> bool {
        new.is_some() && new != old
    }

    changed_opt(&patch.price, &current.price)
        || changed_opt(&patch.address, &current.address)
        || changed_opt(&patch.city, &current.city)
        || changed_opt(&patch.province, &current.province)
        || changed(&patch.property_type, &current.property_type)
        || changed(&patch.transaction_kind, &current.transaction_kind)
        || changed_opt(&patch.bedrooms, &current.bedrooms)
        || changed_opt(&patch.bathrooms, &current.bathrooms)
}
