//! Repository for the `subscriptions` table.

use estate_core::types::DbId;
use sqlx::PgPool;

use crate::models::subscription::SubscriptionRow;

pub struct SubscriptionRepo;

impl SubscriptionRepo {
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<SubscriptionRow>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRow>(
            "SELECT user_id, tier, max_listings FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Insert or replace a user's subscription.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        tier: &str,
        max_listings: Option<i64>,
    ) -> Result<SubscriptionRow, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRow>(
            "INSERT INTO subscriptions (user_id, tier, max_listings) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE \
             SET tier = EXCLUDED.tier, max_listings = EXCLUDED.max_listings, updated_at = NOW() \
             RETURNING user_id, tier, max_listings",
        )
        .bind(user_id)
        .bind(tier)
        .bind(max_listings)
        .fetch_one(pool)
        .await
    }
}
