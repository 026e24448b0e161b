#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use estate_api::auth::jwt::{AccessClaims, JwtConfig};
use estate_api::config::ServerConfig;
use estate_api::router::build_app_router;
use estate_api::state::AppState;
use estate_catalog::cache::MemoryCache;
use estate_catalog::{CacheBackendKind, CatalogConfig, CatalogService, MemoryStore};
use estate_core::listing::UserSummary;
use estate_core::ports::CatalogStore;
use estate_core::quota::{Subscription, UNLIMITED};
use estate_core::roles::{Actor, Role};
use estate_events::EventBus;

pub const OWNER: Actor = Actor {
    user_id: 10,
    role: Role::Member,
};
pub const STRANGER: Actor = Actor {
    user_id: 12,
    role: Role::Member,
};
pub const ADMIN: Actor = Actor {
    user_id: 1,
    role: Role::Admin,
};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            leeway_secs: 60,
        },
        cache_backend: CacheBackendKind::Memory,
        redis_url: None,
        catalog: CatalogConfig::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: ServerConfig,
}

/// The production router over an in-memory store and cache.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    store.add_user(UserSummary {
        id: OWNER.user_id,
        name: "Olive Owner".into(),
        email: Some("olive@example.com".into()),
        phone: None,
    });
    store.set_subscription(Subscription {
        user_id: OWNER.user_id,
        tier: "enterprise".into(),
        max_listings: Some(UNLIMITED),
    });

    let catalog = CatalogService::new(
        store.clone() as Arc<dyn CatalogStore>,
        Arc::new(MemoryCache::new()),
        Arc::new(EventBus::default()),
        config.catalog.clone(),
    );
    let state = AppState {
        catalog: Arc::new(catalog),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        config,
    }
}

impl TestApp {
    /// A token as the identity service would mint it for `actor`.
    pub fn token(&self, actor: Actor) -> String {
        let claims = AccessClaims {
            sub: actor.user_id,
            role: actor.role.as_str().to_string(),
            exp: chrono::Utc::now().timestamp() + 900,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.config.jwt.secret.as_bytes()),
        )
        .expect("token encoding should succeed")
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        actor: Option<Actor>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header("authorization", format!("Bearer {}", self.token(actor)));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, actor: Option<Actor>) -> Response<Body> {
        self.send(Method::GET, uri, actor, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        actor: Option<Actor>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(Method::POST, uri, actor, Some(body)).await
    }

    /// Create a complete listing as [`OWNER`] and return its JSON.
    pub async fn create_listing(&self, title: &str, submit: bool) -> serde_json::Value {
        let response = self
            .post("/api/v1/listings", Some(OWNER), listing_body(title, submit))
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await["data"].clone()
    }

    /// Create, submit and approve a listing; returns its id.
    pub async fn approved_listing(&self, title: &str) -> i64 {
        let created = self.create_listing(title, true).await;
        let id = created["id"].as_i64().unwrap();
        let response = self
            .post(
                &format!("/api/v1/admin/listings/{id}/approve"),
                Some(ADMIN),
                serde_json::json!({}),
            )
            .await;
        assert_eq!(response.status(), 200);
        id
    }

    /// Wait for background work (view counting) to land.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub fn listing_body(title: &str, submit: bool) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "description": "Bright and spacious",
        "property_type": "HOUSE",
        "transaction_kind": "SALE",
        "price": 450000,
        "address": "12 Oak Street",
        "city": "Springfield",
        "bedrooms": 4,
        "bathrooms": 2,
        "features": ["Garden"],
        "images": [{ "url": "https://img.example.com/front.jpg", "caption": null }],
        "submit": submit,
    })
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
