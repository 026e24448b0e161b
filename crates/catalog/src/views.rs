//! Deduplicated view tracking.

use std::sync::Arc;

use estate_core::ports::CatalogStore;
use estate_core::types::{DbId, Timestamp};
use estate_core::views::{ViewOutcome, ViewerIdentity};

pub struct ViewDeduplicator {
    store: Arc<dyn CatalogStore>,
}

impl ViewDeduplicator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Count a view by `viewer` at `now` unless the same identity viewed the
    /// listing inside the dedup window. Never fails: store errors and
    /// missing listings come back as [`ViewOutcome::Skipped`].
    pub async fn record(
        &self,
        listing_id: DbId,
        viewer: &ViewerIdentity,
        now: Timestamp,
    ) -> ViewOutcome {
        match self.store.record_view(listing_id, viewer, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, listing_id, "View tracking failed");
                ViewOutcome::Skipped
            }
        }
    }
}
