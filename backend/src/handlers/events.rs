use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{ADMIN_ONLY, AuthUser},
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
    models::{CreateEventRequest, DishFilter, Event, EventFilter, MenuItem, UpdateEventRequest},
};

/// list_events
///
/// [Public Route] Lists events, optionally filtered by category and status.
#[utoipa::path(
    get,
    path = "/api/events",
    params(EventFilter),
    responses((status = 200, description = "Events", body = [Event]))
)]
pub async fn list_events(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<EventFilter>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.repo.list_events(&filter).await?))
}

/// get_event
///
/// [Public Route] A single event by id.
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Found", body = Event),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Event>, ApiError> {
    state
        .repo
        .get_event(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// get_event_menu
///
/// [Public Route] The menu of an event: every dish it offers, grouped by category.
#[utoipa::path(
    get,
    path = "/api/events/{id}/menu",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Menu", body = [MenuItem]),
        (status = 404, description = "Event Not Found")
    )
)]
pub async fn get_event_menu(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    if state.repo.get_event(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let filter = DishFilter {
        event_id: Some(id),
        category: None,
    };
    Ok(Json(state.repo.list_dishes(&filter).await?))
}

/// create_event
///
/// [Admin Route] Adds an event.
#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Created", body = Event),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_event(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    user.authorize(ADMIN_ONLY)?;
    payload.validate()?;

    let event = state.repo.create_event(payload).await?;
    tracing::info!(event_id = event.id, admin_id = user.id, "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// update_event
///
/// [Admin Route] Partial update. Guest bounds are validated against the stored row.
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated", body = Event),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_event(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    user.authorize(ADMIN_ONLY)?;

    let current = state.repo.get_event(id).await?.ok_or(ApiError::NotFound)?;
    payload.validate_against(&current)?;

    state
        .repo
        .update_event(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_event
///
/// [Admin Route] Deletes an event together with its menu. Refused (409) while
/// orders reference the event.
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Event has orders")
    )
)]
pub async fn delete_event(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<StatusCode, ApiError> {
    user.authorize(ADMIN_ONLY)?;

    if state.repo.delete_event(id).await? {
        tracing::info!(event_id = id, admin_id = user.id, "event deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
