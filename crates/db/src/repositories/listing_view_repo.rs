//! Repository for the `listing_views` table.

use estate_core::types::{DbId, Timestamp};
use estate_core::views::ViewerIdentity;
use sqlx::PgPool;

pub struct ListingViewRepo;

impl ListingViewRepo {
    /// Insert a view event unless `viewer` has one for the listing after
    /// `window_start`, and bump `view_count` when it was inserted.
    ///
    /// The listing row is locked for the duration, so concurrent views of a
    /// listing are checked one at a time. Returns `None` when no live listing
    /// exists, otherwise whether the view was counted.
    pub async fn record_if_new(
        pool: &PgPool,
        listing_id: DbId,
        viewer: &ViewerIdentity,
        at: Timestamp,
        window_start: Timestamp,
    ) -> Result<Option<bool>, sqlx::Error> {
        let (user_id, session_token) = match viewer {
            ViewerIdentity::User(id) => (Some(*id), None),
            ViewerIdentity::Session(token) => (None, Some(token.as_str())),
        };

        let mut tx = pool.begin().await?;

        let live: Option<DbId> = sqlx::query_scalar(
            "SELECT id FROM listings WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(listing_id)
        .fetch_optional(&mut *tx)
        .await?;
        if live.is_none() {
            return Ok(None);
        }

        let inserted = sqlx::query(
            "INSERT INTO listing_views (listing_id, user_id, session_token, viewed_at) \
             SELECT $1, $2, $3, $4 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM listing_views \
                 WHERE listing_id = $1 \
                   AND user_id IS NOT DISTINCT FROM $2 \
                   AND session_token IS NOT DISTINCT FROM $3 \
                   AND viewed_at > $5)",
        )
        .bind(listing_id)
        .bind(user_id)
        .bind(session_token)
        .bind(at)
        .bind(window_start)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE listings SET view_count = view_count + 1 WHERE id = $1")
                .bind(listing_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(inserted))
    }
}
