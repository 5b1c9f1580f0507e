use std::sync::LazyLock;

use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::AppJson,
    models::{
        LoginRequest, NewUser, RegisterRequest, Role, UpdateUserRequest, UserChanges, UserProfile,
        normalize_email,
    },
    password,
    repository::RepoError,
    session::SESSION_COOKIE,
};

// Verified against when the username is unknown, so both paths cost one scrypt run.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| format!("{}.{}", "0".repeat(128), "0".repeat(32)));

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Ends the session named by the request cookie, if any.
fn end_current_session(state: &AppState, jar: &CookieJar) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
}

/// Duplicate usernames and emails are a client input problem on sign-up.
pub(crate) fn conflict_as_validation(err: RepoError) -> ApiError {
    match err {
        RepoError::Conflict(msg) => ApiError::Validation(msg),
        other => other.into(),
    }
}

/// register
///
/// [Public Route] Creates a `client` account and signs it in.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered and signed in", body = UserProfile),
        (status = 400, description = "Invalid payload or username/email taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<UserProfile>), ApiError> {
    payload.validate()?;

    let hashed = password::hash(payload.password).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username.trim().to_string(),
            email: normalize_email(&payload.email),
            password: hashed,
            role: Role::Client,
            phone: payload.phone,
        })
        .await
        .map_err(conflict_as_validation)?;

    end_current_session(&state, &jar);
    let token = state.sessions.create(user.id);
    let jar = jar.add(session_cookie(token, state.config.secure_cookies()));

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, jar, Json(user.into())))
}

/// login
///
/// [Public Route] Verifies credentials and starts a session. Any session carried
/// by the request is replaced.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = UserProfile),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<UserProfile>), ApiError> {
    let user = state.repo.get_user_by_username(payload.username.trim()).await?;

    let stored = user
        .as_ref()
        .map(|u| u.password.clone())
        .unwrap_or_else(|| DUMMY_HASH.clone());
    let verified = password::verify(payload.password, stored).await;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!(username = %payload.username, "failed login");
            return Err(ApiError::Unauthorized);
        }
    };

    end_current_session(&state, &jar);
    let token = state.sessions.create(user.id);
    let jar = jar.add(session_cookie(token, state.config.secure_cookies()));

    tracing::info!(user_id = user.id, "user logged in");
    Ok((jar, Json(user.into())))
}

/// logout
///
/// [Public Route] Destroys the current session (if any) and clears the cookie.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    end_current_session(&state, &jar);
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (StatusCode::NO_CONTENT, jar)
}

/// get_me
///
/// [Authenticated Route] Returns the signed-in user's profile.
#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.repo.get_user(user.id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(profile.into()))
}

/// update_me
///
/// [Authenticated Route] Updates the caller's email, phone or password. Changing the
/// password signs out every other session of the account.
#[utoipa::path(
    patch,
    path = "/api/user",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Attempted to change own role")
    )
)]
pub async fn update_me(
    user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<(CookieJar, Json<UserProfile>), ApiError> {
    if payload.role.is_some() {
        return Err(ApiError::Forbidden);
    }
    payload.validate()?;

    let password_changed = payload.password.is_some();
    let password = match payload.password {
        Some(pw) => Some(password::hash(pw).await?),
        None => None,
    };

    let updated = state
        .repo
        .update_user(
            user.id,
            UserChanges {
                email: payload.email.as_deref().map(normalize_email),
                phone: payload.phone,
                password,
                role: None,
            },
        )
        .await
        .map_err(conflict_as_validation)?
        .ok_or(ApiError::NotFound)?;

    let jar = if password_changed {
        state.sessions.remove_user(user.id);
        let token = state.sessions.create(user.id);
        jar.add(session_cookie(token, state.config.secure_cookies()))
    } else {
        jar
    };

    Ok((jar, Json(updated.into())))
}
