use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Mounted under `/admin`. Each handler takes `AdminUser`, which answers 401 without a
/// valid session and 403 for any role other than `admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard
        // User/subject counts, live sessions and the last five logins.
        .route("/dashboard", get(admin::admin_dashboard))
        // DELETE /admin/sessions/{session_id}
        // Forcibly ends a session; the affected token is rejected immediately.
        .route("/sessions/{session_id}", delete(admin::terminate_session))
        // --- Users ---
        .route("/users", get(admin::list_users).post(admin::create_user))
        // Admins can neither change their own role nor delete themselves.
        .route(
            "/users/{user_id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/users/{user_id}/password", put(admin::reset_user_password))
        // --- Subject tree ---
        .route(
            "/subjects",
            get(admin::list_subjects).post(admin::create_subject),
        )
        .route(
            "/subjects/{subject_id}",
            put(admin::update_subject).delete(admin::delete_subject),
        )
        .route(
            "/subjects/{subject_id}/sections",
            get(admin::list_sections).post(admin::create_section),
        )
        .route(
            "/subjects/{subject_id}/sections/{section_id}",
            put(admin::update_section).delete(admin::delete_section),
        )
        .route(
            "/subjects/{subject_id}/sections/{section_id}/topics",
            get(admin::list_topics).post(admin::create_topic),
        )
        .route(
            "/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}",
            put(admin::update_topic).delete(admin::delete_topic),
        )
        // --- Content blocks ---
        // POST adds a block (empty text by default). PUT edits it, converting the value
        // when the type changes; a rejected edit leaves the stored block untouched.
        .route(
            "/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}/content",
            post(admin::add_content_block),
        )
        .route(
            "/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}/content/{block_id}",
            put(admin::update_content_block).delete(admin::delete_content_block),
        )
}
