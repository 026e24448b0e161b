//! Search query, predicate and pagination types.
//!
//! [`ListingQuery`] is what callers send. The catalog's search composer turns
//! it into a [`ListingPredicate`] plus a [`SortSpec`] and [`PageWindow`];
//! storage adapters translate the predicate into their own query language
//! (SQL in the Postgres adapter, [`ListingPredicate::matches`] in memory).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geo::{BoundingBox, GeoPoint};
use crate::listing::Listing;
use crate::status::{ListingStatus, PropertyType, TransactionKind};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default number of results per page.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Maximum number of results per page.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Default number of featured listings.
pub const DEFAULT_FEATURED_LIMIT: i64 = 6;

/// Maximum number of featured listings.
pub const MAX_FEATURED_LIMIT: i64 = 24;

/// Clamp a user-provided limit to `[1, max]`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Clamp a user-provided page number to at least 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

// ---------------------------------------------------------------------------
// Query input
// ---------------------------------------------------------------------------

/// Allow-listed sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    #[serde(alias = "createdAt")]
    CreatedAt,
    Price,
    #[serde(alias = "viewCount")]
    ViewCount,
    Bedrooms,
    #[serde(alias = "floorArea")]
    FloorArea,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Price => "price",
            SortField::ViewCount => "view_count",
            SortField::Bedrooms => "bedrooms",
            SortField::FloorArea => "floor_area",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters, paging and sort for a listing search. Every field is optional.
///
/// Flat on purpose so it deserializes straight from a query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingQuery {
    pub status: Option<ListingStatus>,
    #[serde(alias = "propertyType")]
    pub property_type: Option<PropertyType>,
    #[serde(alias = "transactionKind")]
    pub transaction_kind: Option<TransactionKind>,
    pub city: Option<String>,
    pub province: Option<String>,
    #[serde(alias = "minPrice")]
    pub min_price: Option<i64>,
    #[serde(alias = "maxPrice")]
    pub max_price: Option<i64>,
    #[serde(alias = "minBedrooms")]
    pub min_bedrooms: Option<i32>,
    #[serde(alias = "maxBedrooms")]
    pub max_bedrooms: Option<i32>,
    #[serde(alias = "minBathrooms")]
    pub min_bathrooms: Option<i32>,
    #[serde(alias = "maxBathrooms")]
    pub max_bathrooms: Option<i32>,
    #[serde(alias = "minFloorArea")]
    pub min_floor_area: Option<f64>,
    #[serde(alias = "maxFloorArea")]
    pub max_floor_area: Option<f64>,
    /// Free text matched against title, description, address and city.
    pub q: Option<String>,
    /// Comma-separated feature tags; a listing must carry all of them.
    pub features: Option<String>,
    #[serde(alias = "ownerId")]
    pub owner_id: Option<DbId>,
    #[serde(alias = "agentId")]
    pub agent_id: Option<DbId>,
    /// Only listings whose featured window is open.
    pub featured: Option<bool>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(alias = "radius", alias = "radiusKm")]
    pub radius_km: Option<f64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<SortField>,
    #[serde(alias = "sortOrder")]
    pub sort_order: Option<SortOrder>,
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Lowercase, trim, drop empties, sort and deduplicate tags.
pub fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Split a comma-separated tag list and normalise it.
pub fn parse_tag_list(list: &str) -> Vec<String> {
    normalize_tags(list.split(','))
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// Inclusive numeric range with optional ends.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NumRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> NumRange<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// An absent value only matches an unbounded range.
    pub fn matches(&self, value: Option<T>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(v) = value else {
            return false;
        };
        self.min.map_or(true, |min| min <= v) && self.max.map_or(true, |max| v <= max)
    }
}

/// Storage-level filter produced by the search composer. All conditions are
/// ANDed; `text` is itself an OR over the text columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingPredicate {
    pub status: Option<ListingStatus>,
    pub property_type: Option<PropertyType>,
    pub transaction_kind: Option<TransactionKind>,
    /// Lowercased substring of `city`.
    pub city_contains: Option<String>,
    /// Lowercased substring of `province`.
    pub province_contains: Option<String>,
    pub price: NumRange<i64>,
    pub bedrooms: NumRange<i32>,
    pub bathrooms: NumRange<i32>,
    pub floor_area: NumRange<f64>,
    /// Lowercased substring of title, description, address or city.
    pub text: Option<String>,
    /// Tags that must all be present.
    pub features_all: Vec<String>,
    pub owner_id: Option<DbId>,
    pub agent_id: Option<DbId>,
    /// Restrict to listings this user owns or is agent of.
    pub participant: Option<DbId>,
    /// Only listings featured at this instant.
    pub featured_at: Option<Timestamp>,
    /// Geo pre-filter applied before paging.
    pub bounds: Option<BoundingBox>,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

impl ListingPredicate {
    /// In-process evaluation, mirroring the SQL the Postgres adapter emits.
    /// Soft-deleted listings never match.
    pub fn matches(&self, listing: &Listing) -> bool {
        if listing.is_deleted() {
            return false;
        }
        if self.status.is_some_and(|s| s != listing.status)
            || self.property_type.is_some_and(|t| t != listing.property_type)
            || self.transaction_kind.is_some_and(|k| k != listing.transaction_kind)
            || self.owner_id.is_some_and(|id| id != listing.owner_id)
            || self.agent_id.is_some_and(|id| Some(id) != listing.agent_id)
        {
            return false;
        }
        if let Some(user) = self.participant {
            if listing.owner_id != user && listing.agent_id != Some(user) {
                return false;
            }
        }
        if let Some(city) = &self.city_contains {
            if !contains_ci(listing.city.as_deref(), city) {
                return false;
            }
        }
        if let Some(province) = &self.province_contains {
            if !contains_ci(listing.province.as_deref(), province) {
                return false;
            }
        }
        if !self.price.matches(listing.price)
            || !self.bedrooms.matches(listing.bedrooms)
            || !self.bathrooms.matches(listing.bathrooms)
            || !self.floor_area.matches(listing.floor_area)
        {
            return false;
        }
        if let Some(text) = &self.text {
            let hit = contains_ci(Some(&listing.title), text)
                || contains_ci(listing.description.as_deref(), text)
                || contains_ci(listing.address.as_deref(), text)
                || contains_ci(listing.city.as_deref(), text);
            if !hit {
                return false;
            }
        }
        if !self
            .features_all
            .iter()
            .all(|tag| listing.features.contains(tag))
        {
            return false;
        }
        if let Some(now) = self.featured_at {
            if !listing.is_featured_at(now) {
                return false;
            }
        }
        if let Some(bounds) = &self.bounds {
            match (listing.latitude, listing.longitude) {
                (Some(lat), Some(lng)) if bounds.contains(GeoPoint::new(lat, lng)) => {}
                _ => return false,
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Sort and paging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    /// Ordering matching `ORDER BY {column} {dir} NULLS LAST, id {dir}`.
    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        fn nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
            match (a, b) {
                (Some(x), Some(y)) => {
                    let o = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                    if order == SortOrder::Asc { o } else { o.reverse() }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }

        let primary = match self.field {
            SortField::CreatedAt => nulls_last(Some(a.created_at), Some(b.created_at), self.order),
            SortField::Price => nulls_last(a.price, b.price, self.order),
            SortField::ViewCount => nulls_last(Some(a.view_count), Some(b.view_count), self.order),
            SortField::Bedrooms => nulls_last(a.bedrooms, b.bedrooms, self.order),
            SortField::FloorArea => nulls_last(a.floor_area, b.floor_area, self.order),
        };
        primary.then_with(|| nulls_last(Some(a.id), Some(b.id), self.order))
    }
}

/// Offset window for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = clamp_page(page);
        let limit = clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        Self {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(window: PageWindow, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + window.limit - 1) / window.limit
        };
        Self {
            page: window.page,
            limit: window.limit,
            total,
            total_pages,
            has_more: window.page < total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
