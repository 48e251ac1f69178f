//! Service configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Unset or unparsable numeric values fall back to defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::MISSING_USER_WARN_WINDOW_SECS;
use crate::domain::topic::DEFAULT_TOPIC_PREFIX;

/// Top-level service configuration.
///
/// Loaded once at startup via [`LighthouseConfig::from_env`].
#[derive(Debug, Clone)]
pub struct LighthouseConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Capacity of the domain event bus broadcast channel.
    pub event_bus_capacity: usize,

    /// Prefix of every event topic.
    pub topic_prefix: String,

    /// Minimum seconds between two "no user" permission warnings.
    pub missing_user_warn_window_secs: i64,

    /// Optional JSON seed file with users, assignments and operations.
    pub seed_file: Option<PathBuf>,

    /// Seconds before an HTTP request is aborted with `408`.
    pub request_timeout_secs: u64,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for LighthouseConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            event_bus_capacity: 10_000,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            missing_user_warn_window_secs: MISSING_USER_WARN_WINDOW_SECS,
            seed_file: None,
            request_timeout_secs: 30,
            log_json: false,
        }
    }
}

impl LighthouseConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };
        let event_bus_capacity =
            parse_env("EVENT_BUS_CAPACITY", defaults.event_bus_capacity).max(1);
        let topic_prefix = std::env::var("TOPIC_PREFIX")
            .ok()
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.topic_prefix);
        let missing_user_warn_window_secs = parse_env(
            "MISSING_USER_WARN_WINDOW_SECS",
            defaults.missing_user_warn_window_secs,
        )
        .max(0);
        let seed_file = std::env::var("SEED_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let request_timeout_secs =
            parse_env("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs).max(1);
        let log_json = parse_env_bool("LOG_JSON", defaults.log_json);

        Ok(Self {
            listen_addr,
            event_bus_capacity,
            topic_prefix,
            missing_user_warn_window_secs,
            seed_file,
            request_timeout_secs,
            log_json,
        })
    }

    /// Missing-user warning window as a duration.
    #[must_use]
    pub fn missing_user_warn_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.missing_user_warn_window_secs)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LighthouseConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.event_bus_capacity, 10_000);
        assert_eq!(config.topic_prefix, "lighthouse/events");
        assert_eq!(config.missing_user_warn_window(), chrono::Duration::hours(3));
        assert!(config.seed_file.is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert!(!config.log_json);
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        assert_eq!(parse_env("LIGHTHOUSE_TEST_SURELY_UNSET", 42_u32), 42);
        assert!(parse_env_bool("LIGHTHOUSE_TEST_SURELY_UNSET", true));
    }
}
