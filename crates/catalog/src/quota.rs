//! Per-owner active-listing limits.

use std::sync::Arc;

use estate_core::error::CoreError;
use estate_core::ports::CatalogStore;
use estate_core::quota::TierLimits;
use estate_core::types::DbId;

pub struct QuotaGuard {
    store: Arc<dyn CatalogStore>,
    limits: TierLimits,
}

impl QuotaGuard {
    pub fn new(store: Arc<dyn CatalogStore>, limits: TierLimits) -> Self {
        Self { store, limits }
    }

    /// Fail with `LISTING_LIMIT_REACHED` if `owner_id` already holds as many
    /// active listings as their tier allows.
    pub async fn assert_within_quota(&self, owner_id: DbId) -> Result<(), CoreError> {
        let subscription = self.store.find_subscription(owner_id).await?;
        let quota = self.limits.resolve(subscription.as_ref());
        if quota.limit.is_none() {
            return Ok(());
        }

        let active = self.store.count_active_for_owner(owner_id).await?;
        quota.check(active).inspect_err(|_| {
            tracing::info!(owner_id, tier = %quota.tier, active, "Listing quota reached");
        })
    }
}
