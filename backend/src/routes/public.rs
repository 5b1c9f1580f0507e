use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: the sign-in flow and read-only access to
/// the event catalogue and its menus.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Session ---
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        // Logout is public so a stale cookie can always be cleared.
        .route("/api/logout", post(handlers::logout))
        // --- Catalogue ---
        // GET /api/events?category=...&status=...
        .route("/api/events", get(handlers::list_events))
        .route("/api/events/{id}", get(handlers::get_event))
        .route("/api/events/{id}/menu", get(handlers::get_event_menu))
        // GET /api/dishes?eventId=...&category=...
        .route("/api/dishes", get(handlers::list_dishes))
        .route("/api/dishes/{id}", get(handlers::get_dish))
}
