use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{Role, User},
    repository::RepositoryState,
    sessions::SessionTracker,
    validators::{validate_password, validate_username},
};

/// Shared session tracker, pulled from `AppState` via `FromRef`.
pub type SessionState = Arc<SessionTracker>;

/// Claims
///
/// Payload of the access tokens issued at login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID.
    pub sub: Uuid,
    /// Session id: must still be tracked by the `SessionTracker` for the token to be accepted.
    pub sid: Uuid,
    /// Issued At (iat).
    pub iat: usize,
    /// Expiration Time (exp).
    pub exp: usize,
}

/// issue_token
///
/// Signs an HS256 token for `user_id` bound to `session_id`. Returns the token and its
/// lifetime in seconds.
pub fn issue_token(
    config: &AppConfig,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<(String, i64), AppError> {
    let now = Utc::now().timestamp();
    let ttl = config.token_ttl_minutes * 60;
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        iat: now as usize,
        exp: (now + ttl) as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))?;
    Ok((token, ttl))
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    /// `None` only for the local `x-user-id` development bypass.
    pub session_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, a known user UUID in `x-user-id` is accepted as-is.
/// 2. Bearer token extraction and JWT validation (signature and expiry).
/// 3. Session check: the token's `sid` must still be tracked; this is what makes logout,
///    re-login elsewhere and admin session termination revoke a token early.
/// 4. User lookup, so deleted users lose access immediately.
///
/// Rejection: `StatusCode::UNAUTHORIZED` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let sessions = SessionState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local
            && let Some(user_id) = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok())
            && let Some(user) = repo.get_user(user_id).await
        {
            return Ok(AuthUser {
                id: user.id,
                username: user.username,
                role: user.role,
                session_id: None,
            });
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let claims = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                    other => tracing::debug!(reason = ?other, "rejected invalid token"),
                }
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        if !sessions.touch(claims.sid) {
            tracing::debug!(session_id = %claims.sid, "token refers to an inactive session");
            return Err(StatusCode::UNAUTHORIZED);
        }

        let user = repo
            .get_user(claims.sub)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            role: user.role,
            session_id: Some(claims.sid),
        })
    }
}

/// AdminUser
///
/// An `AuthUser` whose role is `admin`. Rejects with 401 when unauthenticated and 403
/// for any other role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "non-admin attempted admin access");
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(AdminUser(user))
    }
}

/// ensure_admin
///
/// Creates the configured admin account when the user store is empty. Returns the
/// account it created, if any.
pub async fn ensure_admin(
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<User>, AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(None);
    };
    if !repo.list_users().await.is_empty() {
        return Ok(None);
    }

    validate_username(username).map_err(AppError::bad_request)?;
    validate_password(password).map_err(AppError::bad_request)?;

    let hash = hash_password(password)?;
    let admin = repo
        .create_user(User::new(username.clone(), None, hash, Role::Admin))
        .await?;
    tracing::info!(username = %admin.username, "seeded initial admin account");
    Ok(Some(admin))
}
