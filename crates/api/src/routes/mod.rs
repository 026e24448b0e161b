pub mod admin;
pub mod health;
pub mod listings;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /listings                          search, create
/// /listings/featured                 featured listings
/// /listings/{id}                     detail (id or slug), update, delete
/// /listings/{id}/submit|withdraw     owner workflow
/// /listings/{id}/sold|rented         terminal transitions
/// /listings/{id}/views               view ping
///
/// /admin/listings/{id}/...           moderation and featuring (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/listings", listings::router())
        .nest("/admin/listings", admin::router())
}
