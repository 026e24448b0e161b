//! Audit record shape and action constants for listing mutations.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Entity type recorded for every catalog audit entry.
pub const ENTITY_LISTING: &str = "listing";

/// Known action types for listing audit entries.
pub mod action_types {
    pub const LISTING_CREATE: &str = "listing_create";
    pub const LISTING_UPDATE: &str = "listing_update";
    pub const LISTING_DELETE: &str = "listing_delete";
    pub const LISTING_SUBMIT: &str = "listing_submit";
    pub const LISTING_APPROVE: &str = "listing_approve";
    pub const LISTING_REJECT: &str = "listing_reject";
    pub const LISTING_REQUEST_REVISION: &str = "listing_request_revision";
    pub const LISTING_REQUEUE: &str = "listing_requeue";
    pub const LISTING_WITHDRAW: &str = "listing_withdraw";
    pub const LISTING_MARK_SOLD: &str = "listing_mark_sold";
    pub const LISTING_MARK_RENTED: &str = "listing_mark_rented";
    pub const LISTING_FEATURE: &str = "listing_feature";
    pub const LISTING_UNFEATURE: &str = "listing_unfeature";
}

/// One audit entry handed to the audit collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor_id: DbId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    /// The user affected by the action when it is not the actor (the owner
    /// of a moderated listing).
    pub target_user_id: Option<DbId>,
}

impl AuditRecord {
    /// Entry for a listing action with no snapshots attached yet.
    pub fn listing(actor_id: DbId, action: &str, listing_id: DbId) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            entity_type: ENTITY_LISTING.to_string(),
            entity_id: listing_id,
            old_values: None,
            new_values: None,
            target_user_id: None,
        }
    }

    pub fn with_values(
        mut self,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
    ) -> Self {
        self.old_values = old_values;
        self.new_values = new_values;
        self
    }

    /// Record the affected user, skipping it when it is the actor.
    pub fn with_target(mut self, user_id: DbId) -> Self {
        if user_id != self.actor_id {
            self.target_user_id = Some(user_id);
        }
        self
    }
}
