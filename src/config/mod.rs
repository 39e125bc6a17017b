//! Configuration module for the substitutions backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Weekly free hours given to a newly provisioned teacher.
pub const DEFAULT_WEEKLY_FREE_HOURS: i64 = 3;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API access (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Weekly free hours for teachers created without an explicit allowance
    pub default_weekly_free_hours: i64,
    /// Seconds between background weekly-counter resets (0 disables the task)
    pub reset_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("SUBS_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("SUBS_DB_PATH")
            .unwrap_or_else(|_| "./data/substitutions.sqlite".to_string())
            .into();

        let bind_addr = env::var("SUBS_BIND_ADDR")
            .ok()
            .and_then(|addr| match addr.parse() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    eprintln!("Invalid SUBS_BIND_ADDR {:?}, using 127.0.0.1:8080", addr);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let log_level = env::var("SUBS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = is_json_format(env::var("SUBS_LOG_FORMAT").ok().as_deref());

        let default_weekly_free_hours = env::var("SUBS_DEFAULT_WEEKLY_FREE_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|hours| *hours >= 0)
            .unwrap_or(DEFAULT_WEEKLY_FREE_HOURS);

        let reset_interval_secs = env::var("SUBS_RESET_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            log_json,
            default_weekly_free_hours,
            reset_interval_secs,
        }
    }
}

/// `SUBS_LOG_FORMAT=json` selects JSON logs; anything else means text.
fn is_json_format(value: Option<&str>) -> bool {
    value.is_some_and(|format| format.trim().eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("SUBS_API_PSK");
        env::remove_var("SUBS_DB_PATH");
        env::remove_var("SUBS_BIND_ADDR");
        env::remove_var("SUBS_LOG_LEVEL");
        env::remove_var("SUBS_LOG_FORMAT");
        env::remove_var("SUBS_DEFAULT_WEEKLY_FREE_HOURS");
        env::remove_var("SUBS_RESET_INTERVAL_SECS");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/substitutions.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.default_weekly_free_hours, 3);
        assert_eq!(config.reset_interval_secs, 3600);
    }

    #[test]
    fn test_log_format() {
        assert!(is_json_format(Some("json")));
        assert!(is_json_format(Some(" JSON ")));
        assert!(!is_json_format(Some("text")));
        assert!(!is_json_format(None));
    }
}
