use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{ADMIN_ONLY, AuthUser},
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
    models::{CreateDishRequest, DishFilter, MenuItem, UpdateDishRequest},
};

/// list_dishes
///
/// [Public Route] Lists dishes, optionally for one event and/or one category.
#[utoipa::path(
    get,
    path = "/api/dishes",
    params(DishFilter),
    responses((status = 200, description = "Dishes", body = [MenuItem]))
)]
pub async fn list_dishes(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<DishFilter>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    Ok(Json(state.repo.list_dishes(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/dishes/{id}",
    params(("id" = i32, Path, description = "Dish ID")),
    responses(
        (status = 200, description = "Found", body = MenuItem),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_dish(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<MenuItem>, ApiError> {
    state
        .repo
        .get_dish(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_dish
///
/// [Admin Route] Adds a dish to an event's menu. The owning event must exist.
#[utoipa::path(
    post,
    path = "/api/dishes",
    request_body = CreateDishRequest,
    responses(
        (status = 201, description = "Created", body = MenuItem),
        (status = 400, description = "Invalid payload or unknown event")
    )
)]
pub async fn create_dish(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDishRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    user.authorize(ADMIN_ONLY)?;
    payload.validate()?;

    if state.repo.get_event(payload.event_id).await?.is_none() {
        return Err(ApiError::Validation("eventId does not reference an event".into()));
    }

    let dish = state.repo.create_dish(payload).await?;
    tracing::info!(dish_id = dish.id, event_id = dish.event_id, "dish created");
    Ok((StatusCode::CREATED, Json(dish)))
}

#[utoipa::path(
    put,
    path = "/api/dishes/{id}",
    params(("id" = i32, Path, description = "Dish ID")),
    request_body = UpdateDishRequest,
    responses(
        (status = 200, description = "Updated", body = MenuItem),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_dish(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateDishRequest>,
) -> Result<Json<MenuItem>, ApiError> {
    user.authorize(ADMIN_ONLY)?;
    payload.validate()?;

    state
        .repo
        .update_dish(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_dish
///
/// [Admin Route] Existing orders keep their priced lines.
#[utoipa::path(
    delete,
    path = "/api/dishes/{id}",
    params(("id" = i32, Path, description = "Dish ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_dish(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<StatusCode, ApiError> {
    user.authorize(ADMIN_ONLY)?;

    if state.repo.delete_dish(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
