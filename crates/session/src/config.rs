use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the workout API (default: `http://localhost:4321`).
    pub api_url: String,
    /// Directory holding file-backed drafts (default: `data/drafts`).
    pub draft_dir: PathBuf,
    /// Coalescing window for draft saves (default: 2000 ms).
    pub save_debounce: Duration,
    /// HTTP timeout for workout submission (default: 30 s).
    pub submit_timeout: Duration,
}

pub const DEFAULT_API_URL: &str = "http://localhost:4321";
pub const DEFAULT_DRAFT_DIR: &str = "data/drafts";
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 2000;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            draft_dir: PathBuf::from(DEFAULT_DRAFT_DIR),
            save_debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
            submit_timeout: Duration::from_secs(DEFAULT_SUBMIT_TIMEOUT_SECS),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `LIFTLOG_API_URL`        | `http://localhost:4321` |
    /// | `LIFTLOG_DRAFT_DIR`      | `data/drafts`           |
    /// | `DRAFT_SAVE_DEBOUNCE_MS` | `2000`                  |
    /// | `SUBMIT_TIMEOUT_SECS`    | `30`                    |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back to
    /// their default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("LIFTLOG_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into());

        let draft_dir = lookup("LIFTLOG_DRAFT_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DRAFT_DIR));

        let save_debounce = Duration::from_millis(parse_or_default(
            &lookup,
            "DRAFT_SAVE_DEBOUNCE_MS",
            DEFAULT_SAVE_DEBOUNCE_MS,
        ));
        let submit_timeout = Duration::from_secs(parse_or_default(
            &lookup,
            "SUBMIT_TIMEOUT_SECS",
            DEFAULT_SUBMIT_TIMEOUT_SECS,
        ));

        Self {
            api_url,
            draft_dir,
            save_debounce,
            submit_timeout,
        }
    }
}

fn parse_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default, "Invalid numeric setting, using default");
            default
        }),
    }
}
