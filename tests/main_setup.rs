use learning_platform::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic, path::PathBuf};

const CONFIG_VARS: [&str; 9] = [
    "APP_ENV",
    "JWT_SECRET",
    "DATA_DIR",
    "TOKEN_TTL_MINUTES",
    "SESSION_MAX_AGE_MINUTES",
    "RATE_LIMIT_ENABLED",
    "BIND_ADDR",
    "ADMIN_USERNAME",
    "ADMIN_PASSWORD",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with the given variables set (and every other config variable unset),
/// then restores the environment even if the test panicked.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> std::thread::Result<R>
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    result
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_requires_jwt_secret() {
    let result = run_with_env(&[("APP_ENV", "production")], AppConfig::load);
    assert!(
        result.is_err(),
        "Production config loading should panic without JWT_SECRET"
    );
}

#[test]
#[serial]
fn test_app_config_production_with_secret() {
    let config = run_with_env(
        &[("APP_ENV", "production"), ("JWT_SECRET", "prod-secret")],
        AppConfig::load,
    )
    .unwrap();

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.jwt_secret, "prod-secret");
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
    assert!(config.rate_limit_enabled);
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(&[], AppConfig::load).unwrap();

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.data_dir, PathBuf::from("data"));
    assert_eq!(config.token_ttl_minutes, 60);
    assert_eq!(config.session_max_age_minutes, 30);
    assert_eq!(config.bind_addr, "127.0.0.1:3000");
    assert!(!config.jwt_secret.is_empty());
    assert!(config.admin_username.is_none());
}

#[test]
#[serial]
fn test_app_config_reads_overrides() {
    let config = run_with_env(
        &[
            ("DATA_DIR", "/var/lib/learning"),
            ("TOKEN_TTL_MINUTES", "15"),
            ("RATE_LIMIT_ENABLED", "false"),
            ("ADMIN_USERNAME", "root_admin"),
            ("ADMIN_PASSWORD", "Adm1n!secret"),
        ],
        AppConfig::load,
    )
    .unwrap();

    assert_eq!(config.data_dir, PathBuf::from("/var/lib/learning"));
    assert_eq!(config.token_ttl_minutes, 15);
    assert!(!config.rate_limit_enabled);
    assert_eq!(config.admin_username.as_deref(), Some("root_admin"));
}

#[test]
#[serial]
fn test_app_config_invalid_number_panics() {
    let result = run_with_env(&[("TOKEN_TTL_MINUTES", "an hour")], AppConfig::load);
    assert!(result.is_err());
}
