//! Route definitions for `/admin/listings`.

use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Moderation routes, nested under `/admin/listings`.
///
/// ```text
/// POST   /{id}/approve           approve_listing
/// POST   /{id}/reject            reject_listing
/// POST   /{id}/request-revision  request_revision
/// POST   /{id}/feature           feature_listing
/// DELETE /{id}/feature           unfeature_listing
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/approve", post(admin::approve_listing))
        .route("/{id}/reject", post(admin::reject_listing))
        .route("/{id}/request-revision", post(admin::request_revision))
        .route(
            "/{id}/feature",
            post(admin::feature_listing).delete(admin::unfeature_listing),
        )
}
