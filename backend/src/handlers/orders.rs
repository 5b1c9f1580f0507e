use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{ADMIN_ONLY, AuthUser},
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
    models::{
        CreateOrderRequest, EventStatus, NewOrder, Order, OrderFilter, OrderStatus,
        UpdateOrderStatusRequest, order_total,
    },
};

/// Loads an order the caller may see. Other users' orders are reported as missing.
async fn visible_order(state: &AppState, user: &AuthUser, id: i32) -> Result<Order, ApiError> {
    let order = state.repo.get_order(id).await?.ok_or(ApiError::NotFound)?;
    if !user.is_admin() && order.user_id != user.id {
        return Err(ApiError::NotFound);
    }
    Ok(order)
}

/// list_orders
///
/// [Authenticated Route] Admins see every order (filterable by status and user);
/// clients only ever see their own.
#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderFilter),
    responses((status = 200, description = "Orders", body = [Order]))
)]
pub async fn list_orders(
    user: AuthUser,
    State(state): State<AppState>,
    AppQuery(mut filter): AppQuery<OrderFilter>,
) -> Result<Json<Vec<Order>>, ApiError> {
    if !user.is_admin() {
        filter.user_id = Some(user.id);
    }
    Ok(Json(state.repo.list_orders(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Found", body = Order),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn get_order(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(visible_order(&state, &user, id).await?))
}

/// create_order
///
/// [Authenticated Route] Books an event for the caller.
///
/// The event must be active, the guest count within its bounds, and every selected
/// dish on its menu. The total is priced here from current dish prices and stored
/// with the order in one transaction.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Created", body = Order),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_order(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    payload.validate()?;

    let event = state
        .repo
        .get_event(payload.event_id)
        .await?
        .ok_or_else(|| ApiError::Validation("eventId does not reference an event".into()))?;

    if event.status != EventStatus::Active {
        return Err(ApiError::Validation("event is not accepting orders".into()));
    }
    if payload.guest_count < event.min_guests || payload.guest_count > event.max_guests {
        return Err(ApiError::Validation(format!(
            "guestCount must be between {} and {}",
            event.min_guests, event.max_guests
        )));
    }

    let dishes = state.repo.get_dishes(&payload.menu_selection).await?;
    let prices: HashMap<i32, i64> = dishes
        .iter()
        .filter(|dish| dish.event_id == event.id)
        .map(|dish| (dish.id, dish.price))
        .collect();

    let items = payload
        .menu_selection
        .iter()
        .map(|dish_id| {
            prices
                .get(dish_id)
                .map(|price| (*dish_id, *price))
                .ok_or_else(|| {
                    ApiError::Validation(format!("dish {dish_id} is not on this event's menu"))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let order = state
        .repo
        .create_order(NewOrder {
            user_id: user.id,
            event_id: event.id,
            date: payload.date,
            guest_count: payload.guest_count,
            notes: payload.notes,
            total_amount: order_total(payload.guest_count, &dishes)?,
            items,
        })
        .await?;

    tracing::info!(
        order_id = order.id,
        user_id = user.id,
        total = order.total_amount,
        "order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// update_order_status
///
/// [Authenticated Route] Moves an order through its lifecycle.
///
/// Admins may apply any transition the state machine allows. Clients may only
/// cancel their own pending orders (403 otherwise). A status that changed between
/// read and write yields 409.
#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Order),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Clients may only cancel pending orders"),
        (status = 404, description = "Not Found or Not Yours"),
        (status = 409, description = "Concurrent status change")
    )
)]
pub async fn update_order_status(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = visible_order(&state, &user, id).await?;
    let next = payload.status;

    let client_cancellation =
        order.status == OrderStatus::Pending && next == OrderStatus::Cancelled;
    if !user.is_admin() && !client_cancellation {
        return Err(ApiError::Forbidden);
    }

    if !order.status.can_transition_to(next) {
        return Err(ApiError::Validation(format!(
            "cannot change order status from {:?} to {:?}",
            order.status, next
        )));
    }

    let updated = state
        .repo
        .transition_order(id, order.status, next)
        .await?
        .ok_or_else(|| ApiError::Conflict("order status changed concurrently".into()))?;

    tracing::info!(order_id = id, from = ?order.status, to = ?next, by = user.id, "order status changed");
    Ok(Json(updated))
}

/// delete_order
///
/// [Admin Route] Removes an order and its items.
#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_order(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<StatusCode, ApiError> {
    user.authorize(ADMIN_ONLY)?;

    if state.repo.delete_order(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
