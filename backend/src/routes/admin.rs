use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Catalogue management, order deletion, user management and the dashboard.
/// The whole router sits behind `require_admin`.
///
/// Paths overlapping public or authenticated routes (e.g. `/api/events/{id}`) carry
/// only the write methods here; axum merges method routers for the same path.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Events ---
        .route("/api/events", post(handlers::create_event))
        .route(
            "/api/events/{id}",
            put(handlers::update_event).delete(handlers::delete_event),
        )
        // --- Dishes ---
        .route("/api/dishes", post(handlers::create_dish))
        .route(
            "/api/dishes/{id}",
            put(handlers::update_dish).delete(handlers::delete_dish),
        )
        // --- Orders ---
        .route("/api/orders/{id}", delete(handlers::delete_order))
        // --- Users ---
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // GET /api/admin/stats
        .route("/api/admin/stats", get(handlers::get_admin_stats))
}
