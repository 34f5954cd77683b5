use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, hash_password, issue_token, verify_password},
    error::AppError,
    models::{
        ChangePasswordRequest, LoginRequest, MessageResponse, PublicUser, RegisterRequest, Role,
        TokenResponse, User,
    },
    rate_limit::ClientIp,
    repository::user_edit,
    validators::{validate_email, validate_password, validate_username},
};

/// register
///
/// [Public Route] Creates a regular (non-admin) account. Input is validated in the order
/// username, email, password; the first failure is returned.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = PublicUser),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    validate_username(&username).map_err(AppError::bad_request)?;
    validate_email(&email).map_err(AppError::bad_request)?;
    validate_password(&payload.password).map_err(AppError::bad_request)?;

    let hash = hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(User::new(username, Some(email), hash, Role::User))
        .await?;

    Ok((StatusCode::CREATED, Json(user.public())))
}

/// login
///
/// [Public Route] Verifies credentials, starts a tracked session (evicting any previous
/// session of the same user) and returns a bearer token bound to it.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .repo
        .get_user_by_username(payload.username.trim())
        .await
        .filter(|user| verify_password(&payload.password, &user.password))
        .ok_or_else(|| {
            tracing::info!(username = %payload.username, client = %client, "failed login attempt");
            AppError::InvalidCredentials("Invalid credentials")
        })?;

    let user = state
        .repo
        .update_user(
            user.id,
            user_edit(|user| {
                user.last_login = Some(Utc::now());
                Ok(())
            }),
        )
        .await?;

    let session_id = Uuid::new_v4();
    state
        .sessions
        .track(session_id, user.id, &user.username, &client);
    let (access_token, expires_in) = issue_token(&state.config, user.id, session_id)?;

    tracing::info!(user_id = %user.id, %session_id, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in,
        user: user.public(),
    }))
}

/// logout
///
/// [Authenticated Route] Ends the caller's session; the token stops working immediately.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(user: AuthUser, State(state): State<AppState>) -> Json<MessageResponse> {
    if let Some(session_id) = user.session_id {
        state.sessions.remove(session_id);
    }
    tracing::info!(user_id = %user.id, "user logged out");
    Json(MessageResponse::new("You have been logged out"))
}

/// refresh
///
/// [Authenticated Route] Issues a fresh token for the caller's current session.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token", body = TokenResponse),
        (status = 401, description = "Session expired")
    )
)]
pub async fn refresh(
    user: AuthUser,
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
) -> Result<Json<TokenResponse>, AppError> {
    let account = state
        .repo
        .get_user(user.id)
        .await
        .ok_or(AppError::Unauthorized)?;

    // Bypass requests carry no session; give them one so the token is usable.
    let session_id = match user.session_id {
        Some(sid) => sid,
        None => {
            let sid = Uuid::new_v4();
            state.sessions.track(sid, account.id, &account.username, &client);
            sid
        }
    };
    let (access_token, expires_in) = issue_token(&state.config, account.id, session_id)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in,
        user: account.public(),
    }))
}

/// get_me
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PublicUser>, AppError> {
    let account = state
        .repo
        .get_user(user.id)
        .await
        .ok_or(AppError::NotFound("User not found"))?;
    Ok(Json(account.public()))
}

/// change_password
///
/// [Authenticated Route] Self-service password change; requires the current password.
#[utoipa::path(
    put,
    path = "/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let account = state
        .repo
        .get_user(user.id)
        .await
        .ok_or(AppError::NotFound("User not found"))?;

    if !verify_password(&payload.current_password, &account.password) {
        return Err(AppError::bad_request("Current password is incorrect"));
    }
    if payload.new_password != payload.confirm_password {
        return Err(AppError::bad_request("New passwords do not match"));
    }
    validate_password(&payload.new_password).map_err(AppError::bad_request)?;

    let hash = hash_password(&payload.new_password)?;
    state
        .repo
        .update_user(
            user.id,
            user_edit(move |user| {
                user.password = hash;
                Ok(())
            }),
        )
        .await?;

    tracing::info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}
