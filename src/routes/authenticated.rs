use crate::{AppState, handlers::{auth, subjects}};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Everything a signed-in learner can do. Every request here has already passed the
/// `AuthUser` extractor in the router layer, and handlers extract it again to learn who
/// is calling.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        // POST /auth/logout
        // Drops the session behind the caller's token.
        .route("/auth/logout", post(auth::logout))
        // POST /auth/refresh
        .route("/auth/refresh", post(auth::refresh))
        // --- Account ---
        .route("/me", get(auth::get_me))
        // PUT /me/password
        // Requires the current password alongside the new one.
        .route("/me/password", put(auth::change_password))
        .route("/dashboard", get(subjects::user_dashboard))
        // --- Read API ---
        // GET /api/subjects?page=&per_page=
        // Paginated: 20 per page by default, at most 100.
        .route("/api/subjects", get(subjects::list_subjects))
        .route("/api/subjects/{subject_id}", get(subjects::get_subject))
        .route(
            "/api/subjects/{subject_id}/sections/{section_id}",
            get(subjects::get_section),
        )
        .route(
            "/api/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}",
            get(subjects::get_topic),
        )
}
