//! Notification messages emitted by the approval workflow.

use serde::{Deserialize, Serialize};

use crate::listing::Listing;

/// Notification kind constants, stored verbatim by the notification collaborator.
pub mod kinds {
    pub const LISTING_SUBMITTED: &str = "listing_submitted";
    pub const LISTING_APPROVED: &str = "listing_approved";
    pub const LISTING_REJECTED: &str = "listing_rejected";
    pub const LISTING_REVISION_REQUESTED: &str = "listing_revision_requested";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub message: String,
    pub kind: String,
    pub data: serde_json::Value,
}

impl NotificationMessage {
    fn about(listing: &Listing, kind: &str, title: &str, message: String) -> Self {
        Self {
            title: title.to_string(),
            message,
            kind: kind.to_string(),
            data: serde_json::json!({
                "listing_id": listing.id,
                "slug": listing.slug,
            }),
        }
    }

    /// Sent to administrators when a listing enters the review queue.
    pub fn submitted(listing: &Listing) -> Self {
        Self::about(
            listing,
            kinds::LISTING_SUBMITTED,
            "Listing awaiting review",
            format!("\"{}\" was submitted for approval", listing.title),
        )
    }

    pub fn approved(listing: &Listing) -> Self {
        Self::about(
            listing,
            kinds::LISTING_APPROVED,
            "Listing approved",
            format!("\"{}\" is now published", listing.title),
        )
    }

    pub fn rejected(listing: &Listing, reason: &str) -> Self {
        Self::about(
            listing,
            kinds::LISTING_REJECTED,
            "Listing rejected",
            format!("\"{}\" was rejected: {reason}", listing.title),
        )
    }

    pub fn revision_requested(listing: &Listing, reason: &str) -> Self {
        Self::about(
            listing,
            kinds::LISTING_REVISION_REQUESTED,
            "Changes requested",
            format!("\"{}\" needs changes: {reason}", listing.title),
        )
    }
}
