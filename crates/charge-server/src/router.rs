//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS enabled so front ends on a dev port can reach it.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the router with the built-in HTML status page at `/`.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- `WebSocket` event stream and `user_submit` intake
/// - `POST /reset` -- reset the session
/// - `GET /api/state` -- current snapshot
/// - `POST /api/submit` -- HTTP submission
/// - `GET /api/export` -- CSV export
pub fn build_router(state: Arc<AppState>) -> Router {
    api_routes()
        .route("/", get(handlers::index))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the router serving a built front end from `static_dir`.
///
/// Unknown paths fall back to `index.html` so client-side routes such as
/// `/join` resolve.
pub fn build_router_with_static(state: Arc<AppState>, static_dir: &Path) -> Router {
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));
    api_routes()
        .fallback_service(spa)
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(ws::ws_session))
        .route("/reset", post(handlers::reset))
        .route("/api/state", get(handlers::get_state))
        .route("/api/submit", post(handlers::submit))
        .route("/api/export", get(handlers::export))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
