//! Read access to the `inquiries` table.

use estate_core::types::DbId;
use sqlx::PgPool;

use crate::models::inquiry::InquiryRow;

pub struct InquiryRepo;

impl InquiryRepo {
    /// Newest inquiries for a listing.
    pub async fn recent_for_listing(
        pool: &PgPool,
        listing_id: DbId,
        limit: i64,
    ) -> Result<Vec<InquiryRow>, sqlx::Error> {
        sqlx::query_as::<_, InquiryRow>(
            "SELECT id, sender_name, message, created_at FROM inquiries \
             WHERE listing_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(listing_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
