//! `subscriptions` row model.

use estate_core::quota::Subscription;
use estate_core::types::DbId;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub user_id: DbId,
    pub tier: String,
    pub max_listings: Option<i64>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            user_id: row.user_id,
            tier: row.tier,
            max_listings: row.max_listings,
        }
    }
}
