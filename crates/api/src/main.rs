use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use estate_catalog::cache::{CacheBackend, MemoryCache, RedisCache};
use estate_catalog::{CacheBackendKind, CatalogService};
use estate_core::ports::{AuditSink, CatalogStore, Notifier};
use estate_events::{AuditDispatcher, EventBus, NotificationDispatcher, RetryPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use estate_api::config::ServerConfig;
use estate_api::router::build_app_router;
use estate_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "estate_api=debug,estate_catalog=debug,estate_events=info,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        cache_backend = ?config.cache_backend,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = estate_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    estate_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    estate_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Cache ---
    let cache: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::Memory => Arc::new(MemoryCache::new()),
        CacheBackendKind::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .expect("REDIS_URL must be set when CACHE_BACKEND=redis");
            Arc::new(
                RedisCache::connect(url)
                    .await
                    .expect("Failed to connect to Redis"),
            )
        }
    };
    tracing::info!(backend = ?config.cache_backend, "Cache backend ready");

    // --- Event bus and side-effect dispatchers ---
    let event_bus = Arc::new(EventBus::default());

    let audit: Arc<dyn AuditSink> = Arc::new(estate_db::PgAuditSink::new(pool.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(estate_db::PgNotifier::new(pool.clone()));
    let audit_handle = tokio::spawn(AuditDispatcher::run(
        audit,
        event_bus.subscribe(),
        RetryPolicy::default(),
    ));
    let notify_handle = tokio::spawn(NotificationDispatcher::run(
        notifier,
        event_bus.subscribe(),
        RetryPolicy::default(),
    ));
    tracing::info!("Event dispatchers started (audit, notifications)");

    // --- Catalog service ---
    let store: Arc<dyn CatalogStore> = Arc::new(estate_db::PgCatalogStore::new(pool));
    let catalog = Arc::new(CatalogService::new(
        store,
        cache,
        Arc::clone(&event_bus),
        config.catalog.clone(),
    ));

    let state = AppState {
        catalog: Arc::clone(&catalog),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining side effects");

    // The service holds the last sender clone; dropping both closes the
    // channel and lets the dispatchers finish what is queued.
    drop(catalog);
    drop(event_bus);
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, audit_handle).await.is_err() {
        tracing::warn!("Audit dispatcher did not drain in time");
    }
    if tokio::time::timeout(grace, notify_handle).await.is_err() {
        tracing::warn!("Notification dispatcher did not drain in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
