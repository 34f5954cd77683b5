use std::{env, path::PathBuf, str::FromStr};

const LOCAL_JWT_SECRET: &str = "local-development-secret-change-me";

/// AppConfig
///
/// Immutable runtime configuration, loaded once at startup and shared through `AppState`
/// (handlers and extractors pull it out via `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Runtime environment marker. Controls the `x-user-id` development bypass and log format.
    pub env: Env,
    /// Directory holding `users.json` and `subject_database.json`.
    pub data_dir: PathBuf,
    /// HS256 key used to sign and verify access tokens.
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Inactivity after which a tracked session expires.
    pub session_max_age_minutes: i64,
    /// When false, both rate limiters are bypassed.
    pub rate_limit_enabled: bool,
    pub bind_addr: String,
    // Seed account created on startup when no users exist.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

/// Env
///
/// `Local` enables development conveniences; `Production` requires explicit secrets.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Test configuration: local mode, temp-dir data, rate limiting off.
    fn default() -> Self {
        Self {
            env: Env::Local,
            data_dir: env::temp_dir().join("learning-platform-data"),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_minutes: 60,
            session_max_age_minutes: 30,
            rate_limit_enabled: false,
            bind_addr: "127.0.0.1:3000".to_string(),
            admin_username: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics if `JWT_SECRET` is missing in production, or if a numeric/boolean variable is
    /// set to something unparseable.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let default_bind = match env {
            Env::Production => "0.0.0.0:3000",
            Env::Local => "127.0.0.1:3000",
        };

        Self {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            jwt_secret,
            token_ttl_minutes: parse_var("TOKEN_TTL_MINUTES", 60),
            session_max_age_minutes: parse_var("SESSION_MAX_AGE_MINUTES", 30),
            rate_limit_enabled: parse_var("RATE_LIMIT_ENABLED", true),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| default_bind.to_string()),
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            env,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {key} has an invalid value: {raw}")),
        Err(_) => default,
    }
}
