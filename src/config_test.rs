use super::*;

// =============================================================================
// env_bool / env_parse — unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on", " TRUE "].iter().enumerate() {
        let key = format!("__ARARAT_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__ARARAT_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_or_unset_returns_none() {
    let key = "__ARARAT_EB_INVALID_311__";
    unsafe { std::env::set_var(key, "peut-etre") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__ARARAT_EB_SURELY_UNSET_312__"), None);
}

#[test]
fn env_parse_reads_value_or_falls_back() {
    let key = "__ARARAT_EP_OK_401__";
    unsafe { std::env::set_var(key, " 42 ") };
    assert_eq!(env_parse(key, 7_u64), 42);
    unsafe { std::env::set_var(key, "quarante") };
    assert_eq!(env_parse(key, 7_u64), 7);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_parse("__ARARAT_EP_UNSET_402__", 9_usize), 9);
}

// =============================================================================
// parse_backend
// =============================================================================

#[test]
fn parse_backend_defaults_to_postgres() {
    assert_eq!(parse_backend(None), Ok(StoreBackend::Postgres));
    assert_eq!(parse_backend(Some("")), Ok(StoreBackend::Postgres));
    assert_eq!(parse_backend(Some("Postgres")), Ok(StoreBackend::Postgres));
}

#[test]
fn parse_backend_accepts_memory() {
    assert_eq!(parse_backend(Some(" memory ")), Ok(StoreBackend::Memory));
}

#[test]
fn parse_backend_rejects_unknown() {
    assert_eq!(
        parse_backend(Some("firestore")),
        Err(ConfigError::Invalid { var: "STORE_BACKEND", value: "firestore".into() })
    );
}

// =============================================================================
// AppConfig
// =============================================================================

#[test]
fn default_config_matches_documented_defaults() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.store_backend, StoreBackend::Memory);
    assert_eq!(cfg.unread_poll, Duration::from_secs(10));
    assert_eq!(cfg.reports_poll, Duration::from_secs(60));
    assert_eq!(cfg.poll_max_backoff, Duration::from_secs(300));
    assert_eq!(cfg.recent_reports_limit, 20);
    assert!(cfg.demo_fallback);
    assert!(!cfg.dev_session_issue);
    assert_eq!(cfg.session_ttl, Duration::from_secs(12 * 3600));
    assert!(!cfg.cookie_secure);
}

/// The only test that touches the real variable names.
#[test]
fn from_env_requires_database_url_for_postgres() {
    unsafe {
        std::env::set_var("STORE_BACKEND", "postgres");
        std::env::remove_var("DATABASE_URL");
    }
    assert_eq!(AppConfig::from_env(), Err(ConfigError::MissingVar("DATABASE_URL")));

    unsafe {
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("UNREAD_POLL_SECS", "0");
    }
    let cfg = AppConfig::from_env().unwrap();
    assert_eq!(cfg.store_backend, StoreBackend::Memory);
    assert_eq!(cfg.unread_poll, Duration::from_secs(1));

    unsafe {
        std::env::remove_var("STORE_BACKEND");
        std::env::remove_var("UNREAD_POLL_SECS");
    }
}
