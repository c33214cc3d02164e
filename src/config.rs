//! Service configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_UNREAD_POLL_SECS: u64 = 10;
pub const DEFAULT_REPORTS_POLL_SECS: u64 = 60;
pub const DEFAULT_POLL_MAX_BACKOFF_SECS: u64 = 300;
pub const DEFAULT_RECENT_REPORTS_LIMIT: usize = 20;
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub unread_poll: Duration,
    pub reports_poll: Duration,
    pub poll_max_backoff: Duration,
    pub recent_reports_limit: usize,
    /// Serve demonstration data when the store refuses a read.
    pub demo_fallback: bool,
    /// Expose `POST /api/dev/session`.
    pub dev_session_issue: bool,
    pub session_ttl: Duration,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl Default for AppConfig {
    /// Defaults for an in-process run against the memory backend.
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            unread_poll: Duration::from_secs(DEFAULT_UNREAD_POLL_SECS),
            reports_poll: Duration::from_secs(DEFAULT_REPORTS_POLL_SECS),
            poll_max_backoff: Duration::from_secs(DEFAULT_POLL_MAX_BACKOFF_SECS),
            recent_reports_limit: DEFAULT_RECENT_REPORTS_LIMIT,
            demo_fallback: true,
            dev_session_issue: false,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600),
            cookie_secure: false,
        }
    }
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional (defaults in parentheses):
    /// - `PORT` (3000)
    /// - `STORE_BACKEND`: `postgres` (default) or `memory`
    /// - `DATABASE_URL`: required when the backend is `postgres`
    /// - `DB_MAX_CONNECTIONS` (5)
    /// - `UNREAD_POLL_SECS` (10), `REPORTS_POLL_SECS` (60)
    /// - `POLL_MAX_BACKOFF_SECS` (300)
    /// - `RECENT_REPORTS_LIMIT` (20)
    /// - `DEMO_FALLBACK` (true), `DEV_SESSION_ISSUE` (false)
    /// - `SESSION_TTL_HOURS` (12), `COOKIE_SECURE` (false)
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown backend or a missing `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = parse_backend(std::env::var("STORE_BACKEND").ok().as_deref())?;
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL"));
        }

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            store_backend,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            unread_poll: Duration::from_secs(env_parse("UNREAD_POLL_SECS", DEFAULT_UNREAD_POLL_SECS).max(1)),
            reports_poll: Duration::from_secs(env_parse("REPORTS_POLL_SECS", DEFAULT_REPORTS_POLL_SECS).max(1)),
            poll_max_backoff: Duration::from_secs(env_parse("POLL_MAX_BACKOFF_SECS", DEFAULT_POLL_MAX_BACKOFF_SECS)),
            recent_reports_limit: env_parse("RECENT_REPORTS_LIMIT", DEFAULT_RECENT_REPORTS_LIMIT),
            demo_fallback: env_bool("DEMO_FALLBACK").unwrap_or(true),
            dev_session_issue: env_bool("DEV_SESSION_ISSUE").unwrap_or(false),
            session_ttl: Duration::from_secs(env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS) * 3600),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
        })
    }
}

pub(crate) fn parse_backend(raw: Option<&str>) -> Result<StoreBackend, ConfigError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "postgres") => Ok(StoreBackend::Postgres),
        Some("memory") => Ok(StoreBackend::Memory),
        Some(other) => Err(ConfigError::Invalid { var: "STORE_BACKEND", value: other.to_owned() }),
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
