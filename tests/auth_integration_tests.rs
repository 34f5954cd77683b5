use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use learning_platform::{
    AppState, JsonRepository, JsonStore,
    auth::{AdminUser, AuthUser, Claims, ensure_admin, hash_password, issue_token, verify_password},
    config::{AppConfig, Env},
    models::{Role, User},
    repository::RepositoryState,
};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn create_app_state(env: Env) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config.data_dir =
        std::env::temp_dir().join(format!("learning-platform-auth-{}", Uuid::new_v4()));

    let repo = Arc::new(JsonRepository::new(JsonStore::new(config.data_dir.clone())))
        as RepositoryState;
    AppState::new(repo, config)
}

async fn add_user(state: &AppState, username: &str, role: Role) -> User {
    state
        .repo
        .create_user(User::new(username.to_string(), None, "unused".to_string(), role))
        .await
        .unwrap()
}

/// Registers a session for `user` and returns a token bound to it.
fn login_token(state: &AppState, user: &User) -> (String, Uuid) {
    let sid = Uuid::new_v4();
    state.sessions.track(sid, user.id, &user.username, "127.0.0.1");
    let (token, _) = issue_token(&state.config, user.id, sid).unwrap();
    (token, sid)
}

fn request_parts(bearer: Option<&str>) -> Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let (parts, _) = builder.body(axum::body::Body::empty()).unwrap().into_parts();
    parts
}

// --- Password hashing ---

#[test]
fn test_password_hash_round_trip() {
    let hash = hash_password("Str0ng!pass").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("Str0ng!pass", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("Str0ng!pass", "not-a-phc-string"));
}

// --- AuthUser extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_token_and_session() {
    let state = create_app_state(Env::Production);
    let user = add_user(&state, "alice", Role::User).await;
    let (token, sid) = login_token(&state, &user);

    let mut parts = request_parts(Some(&token));
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.username, "alice");
    assert_eq!(auth_user.role, Role::User);
    assert_eq!(auth_user.session_id, Some(sid));
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = create_app_state(Env::Production);
    let mut parts = request_parts(None);

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_token() {
    let state = create_app_state(Env::Production);
    let user = add_user(&state, "alice", Role::User).await;
    let sid = Uuid::new_v4();
    state.sessions.track(sid, user.id, "alice", "127.0.0.1");

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: user.id,
        sid,
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let mut parts = request_parts(Some(&token));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let state = create_app_state(Env::Production);
    let user = add_user(&state, "alice", Role::User).await;
    let (_, sid) = login_token(&state, &user);

    let mut other = AppConfig::default();
    other.jwt_secret = "some-other-secret".to_string();
    let (forged, _) = issue_token(&other, user.id, sid).unwrap();

    let mut parts = request_parts(Some(&forged));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoked_session_rejects_token() {
    let state = create_app_state(Env::Production);
    let user = add_user(&state, "alice", Role::User).await;
    let (token, sid) = login_token(&state, &user);

    state.sessions.remove(sid);

    let mut parts = request_parts(Some(&token));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_second_login_invalidates_first_token() {
    let state = create_app_state(Env::Production);
    let user = add_user(&state, "alice", Role::User).await;
    let (first, _) = login_token(&state, &user);
    let (second, _) = login_token(&state, &user);

    let mut parts = request_parts(Some(&first));
    assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_err());

    let mut parts = request_parts(Some(&second));
    assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_ok());
}

#[tokio::test]
async fn test_deleted_user_token_is_rejected() {
    let state = create_app_state(Env::Production);
    let user = add_user(&state, "alice", Role::User).await;
    let (token, _) = login_token(&state, &user);

    state.repo.delete_user(user.id).await.unwrap();

    let mut parts = request_parts(Some(&token));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- Local bypass ---

#[tokio::test]
async fn test_local_bypass_success() {
    let state = create_app_state(Env::Local);
    let user = add_user(&state, "devadmin", Role::Admin).await;

    let mut parts = request_parts(None);
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.role, Role::Admin);
    assert_eq!(auth_user.session_id, None);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = create_app_state(Env::Production);
    let user = add_user(&state, "devadmin", Role::Admin).await;

    let mut parts = request_parts(None);
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- AdminUser extractor ---

#[tokio::test]
async fn test_admin_extractor_forbids_regular_users() {
    let state = create_app_state(Env::Production);
    let learner = add_user(&state, "learner", Role::User).await;
    let admin = add_user(&state, "boss", Role::Admin).await;

    let (token, _) = login_token(&state, &learner);
    let mut parts = request_parts(Some(&token));
    let result = AdminUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);

    let (token, _) = login_token(&state, &admin);
    let mut parts = request_parts(Some(&token));
    let AdminUser(resolved) = AdminUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(resolved.id, admin.id);

    let mut parts = request_parts(None);
    let result = AdminUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- Admin seeding ---

#[tokio::test]
async fn test_ensure_admin_only_seeds_empty_store() {
    let mut state = create_app_state(Env::Local);
    state.config.admin_username = Some("root_admin".to_string());
    state.config.admin_password = Some("Adm1n!secret".to_string());

    let seeded = ensure_admin(&state.repo, &state.config).await.unwrap().unwrap();
    assert_eq!(seeded.role, Role::Admin);
    assert!(verify_password("Adm1n!secret", &seeded.password));

    let again = ensure_admin(&state.repo, &state.config).await.unwrap();
    assert!(again.is_none());
    assert_eq!(state.repo.list_users().await.len(), 1);
}
