use crate::catalog::Catalog;
use crate::config::Config;
use crate::playback::PlayerEventBus;
use crate::providers::ProviderRegistry;
use crate::proxy::ProxyService;
use crate::resolver::StreamResolver;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod lookup;
pub mod routes_catalog;
pub mod routes_proxy;
pub mod routes_sse;
pub mod routes_stream;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub resolver: Arc<StreamResolver>,
    pub proxy: Arc<ProxyService>,
    /// Player message channel, created once per process
    pub events: Arc<PlayerEventBus>,
}

impl AppContext {
    /// Build the context with every enabled provider adapter.
    pub fn new(config: Config) -> aniweave_common::Result<Self> {
        let registry = ProviderRegistry::from_config(&config)?;
        Self::with_registry(config, registry)
    }

    /// Build the context around an existing registry.
    pub fn with_registry(config: Config, registry: ProviderRegistry) -> aniweave_common::Result<Self> {
        let registry = Arc::new(registry);
        let proxy = ProxyService::new(&config)?;
        Ok(Self {
            catalog: Arc::new(Catalog::new(registry.clone(), &config)),
            resolver: Arc::new(StreamResolver::new(registry, config.proxy.endpoint.clone())),
            proxy: Arc::new(proxy),
            events: Arc::new(PlayerEventBus::default()),
            config: Arc::new(config),
        })
    }
}

/// CORS for media and catalog routes: read-only with `Range`.
fn media_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::RANGE])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
        ])
}

/// CORS for the player channel, which takes JSON posts.
fn player_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let media = routes_catalog::catalog_routes()
        .merge(routes_stream::stream_routes())
        .merge(routes_proxy::proxy_routes())
        .layer(media_cors());
    let player = routes_sse::player_routes().layer(player_cors());

    Router::new()
        .route("/health", get(health_check))
        .layer(media_cors())
        .nest("/api", media.merge(player))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check(
    axum::extract::State(ctx): axum::extract::State<AppContext>,
) -> impl IntoResponse {
    let providers: Vec<&str> = ctx
        .catalog
        .registry()
        .ids()
        .into_iter()
        .map(|id| id.as_str())
        .collect();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": providers,
    }))
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config).context("Failed to initialise providers")?;
    tracing::info!(
        providers = ctx.catalog.registry().ids().len(),
        allowed_hosts = ctx.proxy.allow_list().hosts().len(),
        "Providers ready"
    );

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
