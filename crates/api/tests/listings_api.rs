//! HTTP-level tests for the listing and moderation endpoints.
//!
//! Requests go straight to the router via `tower::ServiceExt::oneshot`.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, listing_body, ADMIN, OWNER, STRANGER};
use estate_core::roles::{Actor, Role};
use serde_json::json;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_slug_and_draft_status() {
    let app = common::build_test_app();
    let listing = app.create_listing("Modern Family House, 4 Bed", false).await;

    assert_eq!(listing["slug"], "modern-family-house-4-bed");
    assert_eq!(listing["status"], "DRAFT");
    assert_eq!(listing["approval_status"], "PENDING");
    assert_eq!(listing["features"], json!(["garden"]));
    assert_eq!(listing["images"].as_array().unwrap().len(), 1);

    let second = app.create_listing("Modern Family House, 4 Bed", false).await;
    assert_eq!(second["slug"], "modern-family-house-4-bed-1");
}

#[tokio::test]
async fn create_requires_a_valid_token() {
    let app = common::build_test_app();

    let response = app
        .post("/api/v1/listings", None, listing_body("No Auth", false))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/listings")
        .header("authorization", "Bearer not-a-jwt")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(listing_body("Bad", false).to_string()))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submitting_incomplete_listing_returns_incomplete_property() {
    let app = common::build_test_app();
    let mut body = listing_body("No Price", true);
    body["price"] = serde_json::Value::Null;

    let response = app.post("/api/v1/listings", Some(OWNER), body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INCOMPLETE_PROPERTY");

    let mut body = listing_body("No Images", true);
    body["images"] = json!([]);
    let response = app.post("/api/v1/listings", Some(OWNER), body).await;
    assert_eq!(body_json(response).await["code"], "NO_IMAGES");
}

#[tokio::test]
async fn quota_is_enforced_with_402() {
    let app = common::build_test_app();
    let free_user = Actor::new(40, Role::Member);

    for n in 0..3 {
        let response = app
            .post(
                "/api/v1/listings",
                Some(free_user),
                listing_body(&format!("Free {n}"), false),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = app
        .post("/api/v1/listings", Some(free_user), listing_body("Free 3", false))
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body_json(response).await["code"], "LISTING_LIMIT_REACHED");
}

// ---------------------------------------------------------------------------
// Detail and visibility
// ---------------------------------------------------------------------------

#[tokio::test]
async fn drafts_are_hidden_from_anonymous_callers() {
    let app = common::build_test_app();
    let listing = app.create_listing("Hidden Draft", false).await;
    let id = listing["id"].as_i64().unwrap();

    let response = app.get("/api/v1/listings/hidden-draft", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .get(&format!("/api/v1/listings/{id}"), Some(STRANGER))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/api/v1/listings/hidden-draft", Some(OWNER)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["owner"]["name"], "Olive Owner");
}

#[tokio::test]
async fn approval_flow_publishes_the_listing() {
    let app = common::build_test_app();
    let id = app.approved_listing("Sunny Bungalow").await;

    let response = app.get("/api/v1/listings/sunny-bungalow", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], id);
    assert_eq!(json["data"]["status"], "APPROVED");
    assert_eq!(json["data"]["approved_by"], ADMIN.user_id);
    assert!(json["data"]["published_at"].is_string());
}

#[tokio::test]
async fn detail_view_with_session_header_counts_once() {
    let app = common::build_test_app();
    let id = app.approved_listing("Viewed Home").await;

    for _ in 0..2 {
        let request = axum::http::Request::builder()
            .uri("/api/v1/listings/viewed-home")
            .header("x-session-id", "sess-123")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = tower::ServiceExt::oneshot(app.router.clone(), request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        app.settle().await;
    }

    assert_eq!(app.store.raw_listing(id).unwrap().view_count, 1);
}

#[tokio::test]
async fn view_endpoint_reports_outcome() {
    let app = common::build_test_app();
    let id = app.approved_listing("Ping Me").await;
    let uri = format!("/api/v1/listings/{id}/views");

    let response = app.post(&uri, Some(STRANGER), json!({})).await;
    assert_eq!(body_json(response).await["data"]["outcome"], "recorded");

    let response = app.post(&uri, Some(STRANGER), json!({})).await;
    assert_eq!(body_json(response).await["data"]["outcome"], "deduplicated");

    let response = app.post(&uri, None, json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn anonymous_search_ignores_status_filter() {
    let app = common::build_test_app();
    app.create_listing("Draft Only", false).await;
    let id = app.approved_listing("Public Only").await;

    let response = app.get("/api/v1/listings?status=DRAFT", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id);
    assert_eq!(json["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn price_range_search_sorted_ascending() {
    let app = common::build_test_app();
    for (title, price) in [("A", 200_000), ("B", 650_000), ("C", 300_000), ("D", 800_000)] {
        let mut body = listing_body(title, true);
        body["price"] = json!(price);
        let response = app.post("/api/v1/listings", Some(OWNER), body).await;
        let id = body_json(response).await["data"]["id"].as_i64().unwrap();
        app.post(
            &format!("/api/v1/admin/listings/{id}/approve"),
            Some(ADMIN),
            json!({}),
        )
        .await;
    }

    let response = app
        .get(
            "/api/v1/listings?min_price=300000&max_price=700000&sort_by=price&sort_order=asc",
            None,
        )
        .await;
    let json = body_json(response).await;
    let prices: Vec<i64> = json["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["price"].as_i64().unwrap())
        .collect();
    assert_eq!(prices, vec![300_000, 650_000]);
    assert_eq!(json["data"]["pagination"]["limit"], 20);
}

#[tokio::test]
async fn featured_endpoint_lists_featured_listings() {
    let app = common::build_test_app();
    let id = app.approved_listing("Star").await;

    let response = app
        .post(
            &format!("/api/v1/admin/listings/{id}/feature"),
            Some(ADMIN),
            json!({ "days": 7 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(app.get("/api/v1/listings/featured", None).await).await;
    assert_eq!(json["data"][0]["id"], id);
    assert_eq!(json["data"][0]["is_featured"], true);

    let response = app
        .send(
            Method::DELETE,
            &format!("/api/v1/admin/listings/{id}/feature"),
            Some(ADMIN),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(app.get("/api/v1/listings/featured?limit=3", None).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Update, workflow and delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn price_change_sends_listing_back_to_review() {
    let app = common::build_test_app();
    let id = app.approved_listing("Requeue").await;

    let response = app
        .send(
            Method::PUT,
            &format!("/api/v1/listings/{id}"),
            Some(OWNER),
            Some(json!({ "price": 500000 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "PENDING_APPROVAL");

    let response = app.get("/api/v1/listings/requeue", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn moderation_requires_admin_and_reason() {
    let app = common::build_test_app();
    let listing = app.create_listing("Needs Review", true).await;
    let id = listing["id"].as_i64().unwrap();

    let response = app
        .post(
            &format!("/api/v1/admin/listings/{id}/approve"),
            Some(OWNER),
            json!({}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post(
            &format!("/api/v1/admin/listings/{id}/reject"),
            Some(ADMIN),
            json!({ "reason": "" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = app
        .post(
            &format!("/api/v1/admin/listings/{id}/request-revision"),
            Some(ADMIN),
            json!({ "reason": "Add photos of the kitchen" }),
        )
        .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "REVISION_REQUESTED");
    assert_eq!(json["data"]["rejection_reason"], "Add photos of the kitchen");

    let response = app
        .post(&format!("/api/v1/listings/{id}/submit"), Some(OWNER), json!({}))
        .await;
    assert_eq!(body_json(response).await["data"]["status"], "PENDING_APPROVAL");
}

#[tokio::test]
async fn invalid_transition_returns_409() {
    let app = common::build_test_app();
    let listing = app.create_listing("Still Draft", false).await;
    let id = listing["id"].as_i64().unwrap();

    let response = app
        .post(&format!("/api/v1/listings/{id}/sold"), Some(OWNER), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn owner_lifecycle_through_withdraw_and_delete() {
    let app = common::build_test_app();
    let id = app.approved_listing("Lifecycle").await;

    let response = app
        .post(&format!("/api/v1/listings/{id}/withdraw"), Some(STRANGER), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post(&format!("/api/v1/listings/{id}/withdraw"), Some(OWNER), json!({}))
        .await;
    assert_eq!(body_json(response).await["data"]["status"], "WITHDRAWN");

    let response = app
        .send(Method::DELETE, &format!("/api/v1/listings/{id}"), Some(OWNER), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/v1/listings/{id}"), Some(OWNER)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sold_listing_cannot_be_deleted() {
    let app = common::build_test_app();
    let id = app.approved_listing("Sold Out").await;

    app.post(&format!("/api/v1/listings/{id}/sold"), Some(OWNER), json!({}))
        .await;
    let response = app
        .send(Method::DELETE, &format!("/api/v1/listings/{id}"), Some(ADMIN), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn store_outage_returns_503() {
    let app = common::build_test_app();
    app.store.set_unavailable(true);

    let response = app.get("/api/v1/listings", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "STORE_UNAVAILABLE");
}
