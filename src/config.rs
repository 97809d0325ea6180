//! Dashboard runtime configuration from environment variables

use std::env;
use std::time::Duration;

/// Configuration for the dashboard runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Path to the JSON view file
    pub view_path: String,

    /// View to show; first view in the file when unset
    pub view_id: Option<String>,

    /// Path to SQLite event database
    pub db_path: String,

    /// Base URL of an events API; when set, data is fetched over HTTP
    pub api_url: Option<String>,

    /// HTTP fetch timeout; unbounded when unset
    pub fetch_timeout_secs: Option<u64>,

    /// Widget scheduler tick in milliseconds
    pub scheduler_tick_ms: u64,

    /// Data source refresh interval in seconds
    pub refresh_interval_secs: u64,

    /// Retention job interval in minutes
    pub retention_interval_minutes: u64,

    /// Run the terminal dashboard (otherwise headless until CTRL+C)
    pub enable_tui: bool,
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl DashboardConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DASHBOARD_VIEW_PATH` (default: demos/system_view.json)
    /// - `DASHBOARD_VIEW_ID` (default: first view)
    /// - `EVENTS_DB_PATH` (default: data/events.db)
    /// - `EVENTS_API_URL` (default: unset, use SQLite)
    /// - `FETCH_TIMEOUT_SECS` (default: unset)
    /// - `SCHEDULER_TICK_MS` (default: 100)
    /// - `DATA_REFRESH_INTERVAL_SECS` (default: 60)
    /// - `RETENTION_INTERVAL_MINUTES` (default: 60)
    /// - `ENABLE_TUI` (default: true)
    pub fn from_env() -> Self {
        Self {
            view_path: non_empty("DASHBOARD_VIEW_PATH")
                .unwrap_or_else(|| "demos/system_view.json".to_string()),
            view_id: non_empty("DASHBOARD_VIEW_ID"),
            db_path: non_empty("EVENTS_DB_PATH").unwrap_or_else(|| "data/events.db".to_string()),
            api_url: non_empty("EVENTS_API_URL"),
            fetch_timeout_secs: parsed("FETCH_TIMEOUT_SECS"),
            scheduler_tick_ms: parsed("SCHEDULER_TICK_MS").unwrap_or(100),
            refresh_interval_secs: parsed("DATA_REFRESH_INTERVAL_SECS").unwrap_or(60),
            retention_interval_minutes: parsed("RETENTION_INTERVAL_MINUTES").unwrap_or(60),
            enable_tui: parsed("ENABLE_TUI").unwrap_or(true),
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}
