//! `listings` row model.

use estate_core::error::StoreError;
use estate_core::listing::Listing;
use estate_core::status::{ApprovalStatus, ListingStatus, PropertyType, StatusId, TransactionKind};
use estate_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `listings`, with `features` aggregated from `listing_features`.
#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: DbId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub property_type_id: StatusId,
    pub transaction_kind_id: StatusId,
    pub price: Option<i64>,
    pub currency: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub floor_area: Option<f64>,
    pub features: Vec<String>,
    pub status_id: StatusId,
    pub approval_status_id: StatusId,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub approved_by: Option<DbId>,
    pub published_at: Option<Timestamp>,
    pub featured_until: Option<Timestamp>,
    pub view_count: i64,
    pub save_count: i64,
    pub owner_id: DbId,
    pub agent_id: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn lookup<T>(
    id: StatusId,
    column: &str,
    row_id: DbId,
    from_id: fn(StatusId) -> Option<T>,
) -> Result<T, StoreError> {
    from_id(id).ok_or_else(|| {
        StoreError::Corrupt(format!("listing {row_id} has unknown {column} {id}"))
    })
}

impl TryFrom<ListingRow> for Listing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Ok(Listing {
            id,
            slug: row.slug,
            title: row.title,
            description: row.description,
            property_type: lookup(row.property_type_id, "property_type_id", id, PropertyType::from_id)?,
            transaction_kind: lookup(
                row.transaction_kind_id,
                "transaction_kind_id",
                id,
                TransactionKind::from_id,
            )?,
            price: row.price,
            currency: row.currency,
            address: row.address,
            city: row.city,
            province: row.province,
            postal_code: row.postal_code,
            latitude: row.latitude,
            longitude: row.longitude,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            floor_area: row.floor_area,
            features: row.features,
            status: lookup(row.status_id, "status_id", id, ListingStatus::from_id)?,
            approval_status: lookup(
                row.approval_status_id,
                "approval_status_id",
                id,
                ApprovalStatus::from_id,
            )?,
            rejection_reason: row.rejection_reason,
            approved_at: row.approved_at,
            approved_by: row.approved_by,
            published_at: row.published_at,
            featured_until: row.featured_until,
            view_count: row.view_count,
            save_count: row.save_count,
            owner_id: row.owner_id,
            agent_id: row.agent_id,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
