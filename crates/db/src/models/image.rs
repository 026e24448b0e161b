//! `listing_images` row model.

use estate_core::listing::ListingImage;
use estate_core::types::DbId;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ListingImageRow {
    pub id: DbId,
    pub listing_id: DbId,
    pub url: String,
    pub caption: Option<String>,
    pub position: i32,
}

impl From<ListingImageRow> for ListingImage {
    fn from(row: ListingImageRow) -> Self {
        ListingImage {
            id: row.id,
            listing_id: row.listing_id,
            url: row.url,
            caption: row.caption,
            position: row.position,
        }
    }
}
