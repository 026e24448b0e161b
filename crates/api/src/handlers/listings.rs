//! Handlers for public listing reads and owner/agent mutations.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use estate_core::listing::{ListingPatch, NewListing};
use estate_core::search::ListingQuery;
use estate_core::types::DbId;
use estate_core::views::{ViewOutcome, ViewerIdentity};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// Header anonymous browsers send to identify their session for view counting.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Deserialize)]
pub struct FeaturedParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub outcome: ViewOutcome,
}

fn viewer(auth: MaybeAuthUser, headers: &HeaderMap) -> Option<ViewerIdentity> {
    let session = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    ViewerIdentity::resolve(auth.0.map(|u| u.user_id), session)
}

/// GET /api/v1/listings
///
/// Filtered, sorted, paginated search. Anonymous callers only ever see
/// approved listings.
pub async fn search_listings(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<impl IntoResponse> {
    let result = state.catalog.search(&query, auth.actor()).await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/listings/featured?limit=
pub async fn featured_listings(
    State(state): State<AppState>,
    Query(params): Query<FeaturedParams>,
) -> AppResult<impl IntoResponse> {
    let items = state.catalog.get_featured(params.limit).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/listings/{id_or_slug}
///
/// Returns the listing detail and counts a view in the background when the
/// caller can be identified (token or `X-Session-Id`).
pub async fn get_listing(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let detail = state.catalog.get_by_id_or_slug(&key, auth.actor()).await?;

    if let Some(viewer) = viewer(auth, &headers) {
        let catalog = state.catalog.clone();
        let listing_id = detail.listing.id;
        tokio::spawn(async move {
            catalog.record_view(listing_id, &viewer).await;
        });
    }

    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/listings
pub async fn create_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<NewListing>,
) -> AppResult<impl IntoResponse> {
    let detail = state.catalog.create(input, auth.actor()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// PUT /api/v1/listings/{id}
pub async fn update_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(patch): Json<ListingPatch>,
) -> AppResult<impl IntoResponse> {
    let detail = state.catalog.update(id, patch, auth.actor()).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// DELETE /api/v1/listings/{id}
pub async fn delete_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.catalog.delete(id, auth.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/listings/{id}/submit
pub async fn submit_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let listing = state.catalog.submit_for_approval(id, auth.actor()).await?;
    Ok(Json(DataResponse { data: listing }))
}

/// POST /api/v1/listings/{id}/withdraw
pub async fn withdraw_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let listing = state.catalog.withdraw(id, auth.actor()).await?;
    Ok(Json(DataResponse { data: listing }))
}

/// POST /api/v1/listings/{id}/sold
pub async fn mark_sold(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let listing = state.catalog.mark_sold(id, auth.actor()).await?;
    Ok(Json(DataResponse { data: listing }))
}

/// POST /api/v1/listings/{id}/rented
pub async fn mark_rented(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let listing = state.catalog.mark_rented(id, auth.actor()).await?;
    Ok(Json(DataResponse { data: listing }))
}

/// POST /api/v1/listings/{id}/views
///
/// Explicit view ping. Requires a token or an `X-Session-Id` header; the
/// outcome tells the client whether the view was counted.
pub async fn record_view(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let viewer = viewer(auth, &headers).ok_or_else(|| {
        AppError::BadRequest("A bearer token or X-Session-Id header is required".into())
    })?;
    let outcome = state.catalog.record_view(id, &viewer).await;
    Ok(Json(DataResponse {
        data: ViewResponse { outcome },
    }))
}
