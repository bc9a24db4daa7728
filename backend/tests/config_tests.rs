//! Tests for config::ServerConfig - environment handling.

mod support;

use training_hub::config::{BootstrapAdmin, ServerConfig};

const VARS: [&str; 7] = [
    "HOST",
    "PORT",
    "SESSION_TTL_HOURS",
    "AUTH_CACHE_TTL_SECS",
    "PROFILE_LOAD_ATTEMPTS",
    "BOOTSTRAP_ADMIN_EMAIL",
    "BOOTSTRAP_ADMIN_TOKEN",
];

#[test]
fn test_defaults_when_unset() {
    support::with_clean_env(&VARS, &[], || {
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.session_ttl_hours, 12);
        assert_eq!(config.auth_cache_ttl_secs, 30);
        assert!(config.bootstrap_admin.is_none());
    });
}

#[test]
fn test_values_from_env() {
    let overrides = [
        ("HOST", Some("127.0.0.1")),
        ("PORT", Some("9000")),
        ("SESSION_TTL_HOURS", Some("0")),
        ("PROFILE_LOAD_ATTEMPTS", Some("5")),
        ("BOOTSTRAP_ADMIN_EMAIL", Some("admin@example.com")),
        ("BOOTSTRAP_ADMIN_TOKEN", Some("s3cret")),
    ];
    support::with_clean_env(&VARS, &overrides, || {
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(
            config.bootstrap_admin,
            Some(BootstrapAdmin {
                email: "admin@example.com".into(),
                token: "s3cret".into(),
            })
        );
        let auth = config.auth_config();
        assert!(auth.session_ttl.is_none());
        assert_eq!(auth.loader.attempts, 5);
    });
}

#[test]
fn test_invalid_port_is_rejected() {
    support::with_clean_env(&VARS, &[("PORT", Some("eighty"))], || {
        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.contains("PORT"));
    });
}

#[test]
fn test_bootstrap_admin_needs_both_variables() {
    support::with_clean_env(
        &VARS,
        &[("BOOTSTRAP_ADMIN_EMAIL", Some("admin@example.com"))],
        || {
            let err = ServerConfig::from_env().unwrap_err();
            assert!(err.contains("set together"));
        },
    );
}

#[test]
fn test_session_ttl_beyond_a_year_is_rejected() {
    support::with_clean_env(&VARS, &[("SESSION_TTL_HOURS", Some("4294967295"))], || {
        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.contains("SESSION_TTL_HOURS"));
    });
}
