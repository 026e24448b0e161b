//! Moderation and featuring handlers. All routes require the `admin` role.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use estate_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub days: i64,
}

/// POST /api/v1/admin/listings/{id}/approve
pub async fn approve_listing(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let listing = state.catalog.approve(id, admin.actor()).await?;
    Ok(Json(DataResponse { data: listing }))
}

/// POST /api/v1/admin/listings/{id}/reject
pub async fn reject_listing(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReasonRequest>,
) -> AppResult<impl IntoResponse> {
    let listing = state
        .catalog
        .reject(id, admin.actor(), &input.reason)
        .await?;
    Ok(Json(DataResponse { data: listing }))
}

/// POST /api/v1/admin/listings/{id}/request-revision
pub async fn request_revision(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReasonRequest>,
) -> AppResult<impl IntoResponse> {
    let listing = state
        .catalog
        .request_revision(id, admin.actor(), &input.reason)
        .await?;
    Ok(Json(DataResponse { data: listing }))
}

/// POST /api/v1/admin/listings/{id}/feature
pub async fn feature_listing(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<FeatureRequest>,
) -> AppResult<impl IntoResponse> {
    let listing = state
        .catalog
        .feature(id, admin.actor(), input.days)
        .await?;
    Ok(Json(DataResponse { data: listing }))
}

/// DELETE /api/v1/admin/listings/{id}/feature
pub async fn unfeature_listing(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let listing = state.catalog.unfeature(id, admin.actor()).await?;
    Ok(Json(DataResponse { data: listing }))
}
