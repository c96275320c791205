//! Web layer module
//!
//! JSON boundary in front of the artist catalogue. Handlers stay thin and
//! delegate to [`ArtistQueryService`] and [`SnapshotCache`]; request
//! parameters are validated here, before they reach the filter engine.
//!
//! # Routes
//!
//! - `GET /api/v1/artists`: filtered listing
//! - `GET /api/v1/artists/:id`: single artist
//! - `POST /api/v1/snapshot/rebuild`: rebuild the snapshot now
//! - `GET /api/v1/snapshot/status`: cache status
//! - `GET /api/v1/progress`: tracked builds
//! - `GET /health`, `/live`, `/ready`

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{cache::SnapshotCache, config::Config, query::ArtistQueryService};

pub mod api;
pub mod handlers;
pub mod responses;

pub use responses::{handle_error, handle_result, ApiResponse};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(
        config: &Config,
        cache: SnapshotCache,
        query_service: ArtistQueryService,
    ) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        let app = Self::create_router(AppState {
            cache,
            query_service,
        });

        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            // Health check endpoints
            .route("/health", get(handlers::health::health_check))
            .route("/ready", get(handlers::health::readiness_check))
            .route("/live", get(handlers::health::liveness_check))
            // API v1 routes
            .nest("/api/v1", Self::api_v1_routes())
            // Middleware (applied in reverse order)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            // Shared state
            .with_state(state)
    }

    fn api_v1_routes() -> Router<AppState> {
        Router::new()
            .route("/artists", get(api::list_artists))
            .route("/artists/:id", get(api::get_artist))
            .route("/snapshot/rebuild", post(api::rebuild_snapshot))
            .route("/snapshot/status", get(api::snapshot_status))
            .route("/progress", get(api::build_progress))
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: SnapshotCache,
    pub query_service: ArtistQueryService,
}
