use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes: require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Portfolio
        .route("/api/portfolio", get(handlers::portfolio::get))
        .route("/api/portfolio/refresh", post(handlers::portfolio::refresh))
        // Records and wagers
        .route("/api/records", post(handlers::records::create))
        .route("/api/records/:id", get(handlers::records::detail))
        .route("/api/records/:id/wagers", post(handlers::records::place_wager))
        // Session
        .route(
            "/api/session",
            get(handlers::session::get)
                .put(handlers::session::set)
                .delete(handlers::session::clear),
        )
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
