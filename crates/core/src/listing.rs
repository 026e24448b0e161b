//! Listing entity, its read projections and write DTOs.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::{ApprovalStatus, ListingStatus, PropertyType, TransactionKind};
use crate::types::{DbId, Timestamp};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Currency used when the creator does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Number of inquiries embedded in a detail response.
pub const RECENT_INQUIRY_LIMIT: i64 = 5;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A property listing, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: DbId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub transaction_kind: TransactionKind,
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
    /// Normalised feature tags, sorted.
    pub features: Vec<String>,
    pub status: ListingStatus,
    pub approval_status: ApprovalStatus,
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

impl Listing {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the featured window is open at `now`.
    pub fn is_featured_at(&self, now: Timestamp) -> bool {
        self.featured_until.is_some_and(|until| until > now)
    }

    /// Fields a submission requires that are absent or blank.
    pub fn missing_for_submission(&self) -> Vec<&'static str> {
        missing_fields(
            &self.title,
            &self.description,
            self.price,
            &self.address,
            &self.city,
        )
    }

    /// Fixed list projection.
    pub fn summary(&self, now: Timestamp) -> ListingSummary {
        ListingSummary {
            id: self.id,
            slug: self.slug.clone(),
            title: self.title.clone(),
            property_type: self.property_type,
            transaction_kind: self.transaction_kind,
            price: self.price,
            currency: self.currency.clone(),
            city: self.city.clone(),
            province: self.province.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            floor_area: self.floor_area,
            status: self.status,
            view_count: self.view_count,
            is_featured: self.is_featured_at(now),
            created_at: self.created_at,
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn missing_fields(
    title: &str,
    description: &Option<String>,
    price: Option<i64>,
    address: &Option<String>,
    city: &Option<String>,
) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if title.trim().is_empty() {
        missing.push("title");
    }
    if is_blank(description) {
        missing.push("description");
    }
    if price.is_none() {
        missing.push("price");
    }
    if is_blank(address) {
        missing.push("address");
    }
    if is_blank(city) {
        missing.push("city");
    }
    missing
}

// ---------------------------------------------------------------------------
// Read projections
// ---------------------------------------------------------------------------

/// Bounded-size row returned by search and featured endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: DbId,
    pub slug: String,
    pub title: String,
    pub property_type: PropertyType,
    pub transaction_kind: TransactionKind,
    pub price: Option<i64>,
    pub currency: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub floor_area: Option<f64>,
    pub status: ListingStatus,
    pub view_count: i64,
    pub is_featured: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingImage {
    pub id: DbId,
    pub listing_id: DbId,
    pub url: String,
    pub caption: Option<String>,
    pub position: i32,
}

/// Public profile of an owner or agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InquirySummary {
    pub id: DbId,
    pub sender_name: String,
    pub message: String,
    pub created_at: Timestamp,
}

/// Full listing plus collaborator-owned relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub images: Vec<ListingImage>,
    pub owner: Option<UserSummary>,
    pub agent: Option<UserSummary>,
    /// Only populated for the owner and the agent.
    pub recent_inquiries: Vec<InquirySummary>,
}

// ---------------------------------------------------------------------------
// Write DTOs
// ---------------------------------------------------------------------------

/// Reference to an already-uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListingImage {
    pub url: String,
    pub caption: Option<String>,
}

/// Input for creating a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub transaction_kind: TransactionKind,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub floor_area: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
    pub agent_id: Option<DbId>,
    #[serde(default)]
    pub images: Vec<NewListingImage>,
    /// Submit for approval immediately instead of staying in `DRAFT`.
    #[serde(default)]
    pub submit: bool,
}

impl NewListing {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.title)?;
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        validate_numbers(
            self.price,
            self.bedrooms,
            self.bathrooms,
            self.floor_area,
            self.latitude,
            self.longitude,
        )?;
        validate_images(&self.images)
    }
}

/// Partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<PropertyType>,
    pub transaction_kind: Option<TransactionKind>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub floor_area: Option<f64>,
    pub features: Option<Vec<String>>,
    /// Replaces the full image set when present.
    pub images: Option<Vec<NewListingImage>>,
}

impl ListingPatch {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        validate_numbers(
            self.price,
            self.bedrooms,
            self.bathrooms,
            self.floor_area,
            self.latitude,
            self.longitude,
        )?;
        if let Some(images) = &self.images {
            validate_images(images)?;
        }
        Ok(())
    }
}

/// Row to insert, assembled by the catalog from a [`NewListing`].
#[derive(Debug, Clone)]
pub struct ListingRecord {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub transaction_kind: TransactionKind,
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
    pub status: ListingStatus,
    pub owner_id: DbId,
    pub agent_id: Option<DbId>,
    /// Written with the row, in display order.
    pub images: Vec<NewListingImage>,
}

impl ListingRecord {
    /// Same completeness rule as [`Listing::missing_for_submission`], checked
    /// before a create-and-submit writes anything.
    pub fn missing_for_submission(&self) -> Vec<&'static str> {
        missing_fields(
            &self.title,
            &self.description,
            self.price,
            &self.address,
            &self.city,
        )
    }
}

/// A single atomic write against an existing listing: content fields, a
/// recomputed slug, the image set, and optionally a workflow state change.
#[derive(Debug, Clone, Default)]
pub struct ListingChanges {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<PropertyType>,
    pub transaction_kind: Option<TransactionKind>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub floor_area: Option<f64>,
    pub features: Option<Vec<String>>,
    /// Replaces the full image set in the same write.
    pub images: Option<Vec<NewListingImage>>,
    pub state: Option<crate::workflow::StateChange>,
}

impl ListingChanges {
    /// Content part of a patch, with tags normalised.
    pub fn from_patch(patch: &ListingPatch) -> Self {
        Self {
            slug: None,
            title: patch.title.as_ref().map(|t| t.trim().to_string()),
            description: patch.description.clone(),
            property_type: patch.property_type,
            transaction_kind: patch.transaction_kind,
            price: patch.price,
            currency: patch.currency.as_ref().map(|c| c.to_ascii_uppercase()),
            address: patch.address.clone(),
            city: patch.city.clone(),
            province: patch.province.clone(),
            postal_code: patch.postal_code.clone(),
            latitude: patch.latitude,
            longitude: patch.longitude,
            bedrooms: patch.bedrooms,
            bathrooms: patch.bathrooms,
            floor_area: patch.floor_area,
            features: patch
                .features
                .as_ref()
                .map(|tags| crate::search::normalize_tags(tags.iter().map(String::as_str))),
            images: patch.images.clone(),
            state: None,
        }
    }

    /// Only a state change, no content.
    pub fn state_only(state: crate::workflow::StateChange) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_title(title: &str) -> Result<(), CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), CoreError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Currency '{currency}' must be a three-letter ISO code"
        )))
    }
}

fn validate_numbers(
    price: Option<i64>,
    bedrooms: Option<i32>,
    bathrooms: Option<i32>,
    floor_area: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(), CoreError> {
    if price.is_some_and(|p| p < 0) {
        return Err(CoreError::Validation("Price must not be negative".into()));
    }
    if bedrooms.is_some_and(|b| b < 0) || bathrooms.is_some_and(|b| b < 0) {
        return Err(CoreError::Validation(
            "Bedroom and bathroom counts must not be negative".into(),
        ));
    }
    if floor_area.is_some_and(|a| !a.is_finite() || a <= 0.0) {
        return Err(CoreError::Validation("Floor area must be positive".into()));
    }
    if latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(CoreError::Validation(
            "Latitude must be between -90 and 90".into(),
        ));
    }
    if longitude.is_some_and(|lng| !(-180.0..=180.0).contains(&lng)) {
        return Err(CoreError::Validation(
            "Longitude must be between -180 and 180".into(),
        ));
    }
    Ok(())
}

fn validate_images(images: &[NewListingImage]) -> Result<(), CoreError> {
    if images.iter().any(|img| img.url.trim().is_empty()) {
        return Err(CoreError::Validation("Image URL must not be empty".into()));
    }
    Ok(())
}
