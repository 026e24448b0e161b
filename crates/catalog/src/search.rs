//! Listing search: query composition, visibility, geo radius and caching.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use estate_core::error::CoreError;
use estate_core::geo::{GeoPoint, GeoRadius};
use estate_core::hashing::sha256_hex;
use estate_core::listing::{Listing, ListingSummary};
use estate_core::ports::CatalogStore;
use estate_core::roles::Actor;
use estate_core::search::{
    clamp_limit, parse_tag_list, ListingPredicate, ListingQuery, NumRange, PageWindow,
    PagedResult, Pagination, SortField, SortOrder, SortSpec, DEFAULT_FEATURED_LIMIT,
    MAX_FEATURED_LIMIT,
};
use estate_core::status::ListingStatus;
use estate_core::types::{DbId, Timestamp};
use serde::Serialize;

use crate::cache::{keys, Cache};

/// Which listings a caller may see, independent of their filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "user_id", rename_all = "snake_case")]
pub enum Visibility {
    /// Approved listings only.
    Public,
    /// A non-approved status filter from a signed-in non-admin: only
    /// listings they own or act as agent for.
    Participant(DbId),
    Admin,
}

/// A query resolved into what the store executes plus the post-filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedSearch {
    pub predicate: ListingPredicate,
    pub sort: SortSpec,
    pub window: PageWindow,
    pub radius: Option<GeoRadius>,
    pub visibility: Visibility,
}

impl ComposedSearch {
    /// Haversine check; listings without coordinates never match a radius.
    fn within_radius(&self, listing: &Listing) -> bool {
        let Some(radius) = self.radius else {
            return true;
        };
        match (listing.latitude, listing.longitude) {
            (Some(lat), Some(lng)) => radius.contains(GeoPoint::new(lat, lng)),
            _ => false,
        }
    }
}

/// Build the storage predicate for `query` as seen by `caller` at `now`.
///
/// The visibility constraint is applied after the caller's filters so no
/// filter combination can widen it.
pub fn compose(
    query: &ListingQuery,
    caller: Option<Actor>,
    now: Timestamp,
) -> Result<ComposedSearch, CoreError> {
    let text = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut predicate = ListingPredicate {
        status: query.status,
        property_type: query.property_type,
        transaction_kind: query.transaction_kind,
        city_contains: non_blank_lower(query.city.as_deref()),
        province_contains: non_blank_lower(query.province.as_deref()),
        price: NumRange::new(query.min_price, query.max_price),
        bedrooms: NumRange::new(query.min_bedrooms, query.max_bedrooms),
        bathrooms: NumRange::new(query.min_bathrooms, query.max_bathrooms),
        floor_area: NumRange::new(query.min_floor_area, query.max_floor_area),
        text,
        features_all: query.features.as_deref().map(parse_tag_list).unwrap_or_default(),
        owner_id: query.owner_id,
        agent_id: query.agent_id,
        participant: None,
        featured_at: query.featured.unwrap_or(false).then_some(now),
        bounds: None,
    };

    let radius = geo_radius(query)?;
    predicate.bounds = radius.map(|r| r.bounding_box());

    let visibility = match caller {
        Some(actor) if actor.is_admin() => Visibility::Admin,
        Some(actor) => match query.status {
            Some(status) if status != ListingStatus::Approved => {
                Visibility::Participant(actor.user_id)
            }
            _ => Visibility::Public,
        },
        None => Visibility::Public,
    };
    match visibility {
        Visibility::Public => predicate.status = Some(ListingStatus::Approved),
        Visibility::Participant(user_id) => predicate.participant = Some(user_id),
        Visibility::Admin => {}
    }

    Ok(ComposedSearch {
        predicate,
        sort: SortSpec {
            field: query.sort_by.unwrap_or_default(),
            order: query.sort_order.unwrap_or_default(),
        },
        window: PageWindow::new(query.page, query.limit),
        radius,
        visibility,
    })
}

fn non_blank_lower(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// A radius applies only when lat, lng and radius are all present.
fn geo_radius(query: &ListingQuery) -> Result<Option<GeoRadius>, CoreError> {
    let (Some(lat), Some(lng), Some(radius_km)) = (query.lat, query.lng, query.radius_km) else {
        return Ok(None);
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(CoreError::Validation(
            "Search coordinates are out of range".into(),
        ));
    }
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(CoreError::Validation("Search radius must be positive".into()));
    }
    Ok(Some(GeoRadius {
        center: GeoPoint::new(lat, lng),
        radius_km,
    }))
}

/// Digest of everything that shapes a search response.
fn cache_digest(query: &ListingQuery, visibility: Visibility) -> Result<String, CoreError> {
    let canonical = serde_json::to_vec(&(query, visibility))
        .map_err(|e| CoreError::Internal(format!("search key encoding failed: {e}")))?;
    Ok(sha256_hex(&canonical))
}

pub struct SearchComposer {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
    featured_ttl: Duration,
}

impl SearchComposer {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Cache, featured_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            featured_ttl,
        }
    }

    pub async fn search(
        &self,
        query: &ListingQuery,
        caller: Option<Actor>,
    ) -> Result<PagedResult<ListingSummary>, CoreError> {
        let now = Utc::now();
        let composed = compose(query, caller, now)?;
        let key = keys::search(&cache_digest(query, composed.visibility)?);
        self.cache
            .get_or_set(&key, None, || self.execute(&composed, now))
            .await
    }

    /// Approved listings whose featured window is open, newest first.
    pub async fn featured(&self, limit: Option<i64>) -> Result<Vec<ListingSummary>, CoreError> {
        let limit = clamp_limit(limit, DEFAULT_FEATURED_LIMIT, MAX_FEATURED_LIMIT);
        let now = Utc::now();
        let composed = ComposedSearch {
            predicate: ListingPredicate {
                status: Some(ListingStatus::Approved),
                featured_at: Some(now),
                ..ListingPredicate::default()
            },
            sort: SortSpec {
                field: SortField::CreatedAt,
                order: SortOrder::Desc,
            },
            window: PageWindow {
                page: 1,
                limit,
                offset: 0,
            },
            radius: None,
            visibility: Visibility::Public,
        };
        self.cache
            .get_or_set(
                &keys::featured(limit),
                Some(self.featured_ttl),
                move || async move { Ok(self.execute(&composed, now).await?.items) },
            )
            .await
    }

    async fn execute(
        &self,
        composed: &ComposedSearch,
        now: Timestamp,
    ) -> Result<PagedResult<ListingSummary>, CoreError> {
        let (rows, total) = self
            .store
            .search(&composed.predicate, composed.sort, composed.window)
            .await?;
        let items = rows
            .iter()
            .filter(|listing| composed.within_radius(listing))
            .map(|listing| listing.summary(now))
            .collect();
        Ok(PagedResult {
            items,
            pagination: Pagination::new(composed.window, total),
        })
    }
}
