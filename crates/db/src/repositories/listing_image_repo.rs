//! Repository for the `listing_images` table.

use estate_core::listing::NewListingImage;
use estate_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::image::ListingImageRow;

const COLUMNS: &str = "id, listing_id, url, caption, position";

pub struct ListingImageRepo;

impl ListingImageRepo {
    /// Images of a listing in display order.
    pub async fn list_for_listing(
        pool: &PgPool,
        listing_id: DbId,
    ) -> Result<Vec<ListingImageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM listing_images WHERE listing_id = $1 ORDER BY position, id"
        );
        sqlx::query_as::<_, ListingImageRow>(&query)
            .bind(listing_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_listing(pool: &PgPool, listing_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM listing_images WHERE listing_id = $1",
        )
        .bind(listing_id)
        .fetch_one(pool)
        .await
    }

    /// Replace every image of a listing on `conn`, which the caller holds
    /// inside the listing write's transaction. Input order becomes
    /// `position`.
    pub async fn replace_all(
        conn: &mut PgConnection,
        listing_id: DbId,
        images: &[NewListingImage],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM listing_images WHERE listing_id = $1")
            .bind(listing_id)
            .execute(&mut *conn)
            .await?;

        for (position, image) in images.iter().enumerate() {
            sqlx::query(
                "INSERT INTO listing_images (listing_id, url, caption, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(listing_id)
            .bind(image.url.trim())
            .bind(&image.caption)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
