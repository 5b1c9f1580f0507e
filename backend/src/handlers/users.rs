use axum::{Json, extract::State, http::StatusCode};

use super::session::conflict_as_validation;
use crate::{
    AppState,
    auth::{ADMIN_ONLY, AuthUser},
    error::ApiError,
    extract::{AppJson, AppPath},
    models::{
        AdminDashboardStats, CreateUserRequest, NewUser, UpdateUserRequest, UserChanges,
        UserProfile, normalize_email,
    },
    password,
};

/// list_users
///
/// [Admin Route] Every account, newest first.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users", body = [UserProfile]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    user.authorize(ADMIN_ONLY)?;
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<UserProfile>, ApiError> {
    user.authorize(ADMIN_ONLY)?;
    state
        .repo
        .get_user(id)
        .await?
        .map(|u| Json(u.into()))
        .ok_or(ApiError::NotFound)
}

/// create_user
///
/// [Admin Route] Creates an account with an explicit role (e.g. another admin).
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 400, description = "Invalid payload or username/email taken")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    user.authorize(ADMIN_ONLY)?;
    payload.validate()?;

    let hashed = password::hash(payload.password).await?;
    let created = state
        .repo
        .create_user(NewUser {
            username: payload.username.trim().to_string(),
            email: normalize_email(&payload.email),
            password: hashed,
            role: payload.role,
            phone: payload.phone,
        })
        .await
        .map_err(conflict_as_validation)?;

    tracing::info!(user_id = created.id, role = ?created.role, admin_id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// update_user
///
/// [Admin Route] Partial update, including role changes. A password reset signs
/// the account out everywhere.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    user.authorize(ADMIN_ONLY)?;
    payload.validate()?;

    let password_reset = payload.password.is_some();
    let password = match payload.password {
        Some(pw) => Some(password::hash(pw).await?),
        None => None,
    };

    let updated = state
        .repo
        .update_user(
            id,
            UserChanges {
                email: payload.email.as_deref().map(normalize_email),
                phone: payload.phone,
                password,
                role: payload.role,
            },
        )
        .await
        .map_err(conflict_as_validation)?
        .ok_or(ApiError::NotFound)?;

    if password_reset {
        state.sessions.remove_user(id);
    }
    Ok(Json(updated.into()))
}

/// delete_user
///
/// [Admin Route] Deletes an account and ends its sessions. Admins cannot delete
/// themselves; accounts with orders are refused (409).
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "User has orders")
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<StatusCode, ApiError> {
    user.authorize(ADMIN_ONLY)?;
    if id == user.id {
        return Err(ApiError::Validation("cannot delete your own account".into()));
    }

    if state.repo.delete_user(id).await? {
        state.sessions.remove_user(id);
        tracing::info!(user_id = id, admin_id = user.id, "user deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// get_admin_stats
///
/// [Admin Route] Counters for the administration dashboard.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    user.authorize(ADMIN_ONLY)?;
    Ok(Json(state.repo.get_stats().await?))
}
