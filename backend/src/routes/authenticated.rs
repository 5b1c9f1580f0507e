use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Authenticated Router Module
///
/// Endpoints for any signed-in user. Ownership is enforced inside the order handlers:
/// clients only ever reach their own orders.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PATCH /api/user
        // The caller's own profile. Role changes are refused here.
        .route("/api/user", get(handlers::get_me).patch(handlers::update_me))
        // GET /api/orders?status=...&userId=...
        // POST /api/orders places an order priced server-side.
        .route(
            "/api/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/api/orders/{id}", get(handlers::get_order))
        // PATCH /api/orders/{id}/status
        // Admins drive the lifecycle; clients may only cancel a pending order.
        .route("/api/orders/{id}/status", patch(handlers::update_order_status))
}
