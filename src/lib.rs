use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core: content-block validation/conversion and the data model it operates on.
pub mod content;
pub mod models;

// Persistence, identity and request guards.
pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod repository;
pub mod sessions;
pub mod store;
pub mod validators;

// HTTP surface.
pub mod handlers;
pub mod routes;
use auth::{AuthUser, SessionState};
use rate_limit::{ClientIp, RateLimiter};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{JsonRepository, RepositoryState};
pub use store::JsonStore;

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// ApiDoc
///
/// OpenAPI document for every annotated handler, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register, handlers::auth::login, handlers::auth::logout,
        handlers::auth::refresh, handlers::auth::get_me, handlers::auth::change_password,
        handlers::subjects::list_public_subjects, handlers::subjects::get_public_subject,
        handlers::subjects::user_dashboard, handlers::subjects::list_subjects,
        handlers::subjects::get_subject, handlers::subjects::get_section,
        handlers::subjects::get_topic,
        handlers::admin::admin_dashboard, handlers::admin::terminate_session,
        handlers::admin::list_users, handlers::admin::create_user, handlers::admin::update_user,
        handlers::admin::delete_user, handlers::admin::reset_user_password,
        handlers::admin::list_subjects, handlers::admin::create_subject,
        handlers::admin::update_subject, handlers::admin::delete_subject,
        handlers::admin::list_sections, handlers::admin::create_section,
        handlers::admin::update_section, handlers::admin::delete_section,
        handlers::admin::list_topics, handlers::admin::create_topic,
        handlers::admin::update_topic, handlers::admin::delete_topic,
        handlers::admin::add_content_block, handlers::admin::update_content_block,
        handlers::admin::delete_content_block
    ),
    components(
        schemas(
            models::Role, models::PublicUser, models::BlockType, models::ImageValue,
            models::TableValue, models::BlockContent, models::ContentBlock, models::Topic,
            models::Section, models::Subject, models::RegisterRequest, models::LoginRequest,
            models::ChangePasswordRequest, models::ResetPasswordRequest,
            models::CreateUserRequest, models::UpdateUserRequest, models::CreateSubjectRequest,
            models::UpdateSubjectRequest, models::SectionRequest, models::TopicRequest,
            models::ContentBlockRequest, models::TokenResponse, models::SubjectSummary,
            models::SessionInfo, models::RecentActivity, models::AdminDashboard,
            models::UserDashboard, models::MessageResponse,
        )
    ),
    tags(
        (name = "learning-platform", description = "Learning platform content API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The shared application state. Everything in-memory (sessions, rate-limit counters)
/// lives here rather than in globals, so each router built from a fresh state is isolated.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub sessions: SessionState,
    pub api_limiter: Arc<RateLimiter>,
    pub login_limiter: Arc<RateLimiter>,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state with fresh session and rate-limit tables sized from `config`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let max_age = chrono::Duration::minutes(config.session_max_age_minutes);
        Self {
            repo,
            sessions: Arc::new(sessions::SessionTracker::new(max_age)),
            api_limiter: Arc::new(RateLimiter::api()),
            login_limiter: Arc::new(RateLimiter::login()),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated route group.
///
/// *Mechanism*: the only thing it does is extract `AuthUser`. If the token does not check
/// out, the extractor rejects with 401 before the handler runs; otherwise the request
/// continues untouched.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// api_rate_limit
///
/// 100 requests per minute per client on authenticated and admin routes.
async fn api_rate_limit(
    State(state): State<AppState>,
    client: ClientIp,
    request: Request,
    next: Next,
) -> Response {
    enforce_limit(&state, &state.api_limiter, client, request, next).await
}

/// login_rate_limit
///
/// 20 requests per minute per client on the credential endpoints.
async fn login_rate_limit(
    State(state): State<AppState>,
    client: ClientIp,
    request: Request,
    next: Next,
) -> Response {
    enforce_limit(&state, &state.login_limiter, client, request, next).await
}

/// enforce_limit
///
/// *Mechanism*: one fixed-window counter per client key. Over the limit, the request is
/// answered here with 429 and a `Retry-After` header holding the seconds left in the window.
async fn enforce_limit(
    state: &AppState,
    limiter: &RateLimiter,
    ClientIp(client): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    if state.config.rate_limit_enabled
        && let Err(retry_after) = limiter.check(&client)
    {
        tracing::warn!(client = %client, path = %request.uri().path(), "rate limit exceeded");
        let mut response = AppError::RateLimited.into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }
    next.run(request).await
}

/// create_router
///
/// Assembles the route groups with their guards, registers the shared state and wraps
/// the whole router in the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Correlation header shared by the request-id layers and the trace span.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Swagger UI plus the raw OpenAPI document.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: catalogue and health, no guard.
        .merge(public::public_routes())
        // Credential Routes: register and login, limited per client.
        .merge(
            public::credential_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit)),
        )
        // Authenticated Routes: layers added later run first, so the rate limit is
        // checked before the token.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
                .route_layer(middleware::from_fn_with_state(state.clone(), api_rate_limit)),
        )
        // Admin Routes: nested under '/admin'. The role check is the `AdminUser`
        // extractor on each handler.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), api_rate_limit)),
        )
        // Oversized bodies are refused with 413 before any extractor reads them.
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    // 3. Observability and Correlation Layers (outermost, so they see every request)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a fresh UUID unless the client sent one.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echoes x-request-id back on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`. Reads the `x-request-id` set by `SetRequestIdLayer` and
/// records it next to the method and URI.
///
/// *Goal*: every log line written while serving one request carries the same ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
