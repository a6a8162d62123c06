//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

use std::time::Duration;

/// Default backend address when no config file or env override is present
pub const DEFAULT_BASE_URL: &str = "http://localhost:5005";

/// Delay between the end of one poll cycle and the start of the next
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// How long a dashboard/admin alert stays visible
pub const DEFAULT_ALERT_SECS: u64 = 4;

/// How long a login error stays visible
pub const LOGIN_ERROR_SECS: u64 = 5;

/// App actor housekeeping tick (alert expiry, poll scheduling)
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Data directory name under the home directory
pub const DATA_DIR_NAME: &str = ".plugdeck";

/// Config file inside the data directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Token file inside the data directory (client-local storage)
pub const TOKEN_FILE: &str = "token";

/// Cookie mirror file inside the data directory
pub const COOKIE_FILE: &str = "cookies.json";

/// Log file, written next to the working directory
pub const LOG_FILE: &str = "plugdeck.log";

/// Name of the token cookie the backend reads
pub const TOKEN_COOKIE_NAME: &str = "access_token";

/// Cookie mirror lifetime
pub const TOKEN_COOKIE_MAX_AGE_SECS: i64 = 86_400;

/// Admin form rules
pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 4;

/// Env overrides
pub const ENV_BASE_URL: &str = "PLUGDECK_BASE_URL";
pub const ENV_USER: &str = "PLUGDECK_USER";

/// Application name
pub const APP_NAME: &str = "plugdeck";
