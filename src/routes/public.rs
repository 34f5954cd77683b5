use crate::{AppState, handlers::{auth, subjects}};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read-only catalogue access and a health check. Subject names and descriptions in the
/// listing are HTML-sanitized by the handler.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /subjects
        .route("/subjects", get(subjects::list_public_subjects))
        // GET /subjects/{subject_id}
        .route("/subjects/{subject_id}", get(subjects::get_public_subject))
}

/// Credential Router
///
/// Registration and login. `create_router` wraps these in the login rate limiter
/// (20 requests per minute per client).
pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}
