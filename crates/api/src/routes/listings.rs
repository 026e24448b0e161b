//! Route definitions for `/listings`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::listings;
use crate::state::AppState;

/// Listing routes, nested under `/listings`.
///
/// `{id}` accepts a numeric id or a slug on GET and only a numeric id
/// elsewhere.
///
/// ```text
/// GET    /                   search_listings
/// POST   /                   create_listing
/// GET    /featured           featured_listings
/// GET    /{id}               get_listing
/// PUT    /{id}               update_listing
/// DELETE /{id}               delete_listing
/// POST   /{id}/submit        submit_listing
/// POST   /{id}/withdraw      withdraw_listing
/// POST   /{id}/sold          mark_sold
/// POST   /{id}/rented        mark_rented
/// POST   /{id}/views         record_view
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(listings::search_listings).post(listings::create_listing),
        )
        .route("/featured", get(listings::featured_listings))
        .route(
            "/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/{id}/submit", post(listings::submit_listing))
        .route("/{id}/withdraw", post(listings::withdraw_listing))
        .route("/{id}/sold", post(listings::mark_sold))
        .route("/{id}/rented", post(listings::mark_rented))
        .route("/{id}/views", post(listings::record_view))
}
