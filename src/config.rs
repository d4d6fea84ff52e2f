use std::path::PathBuf;
use std::time::Duration;

pub const FINNHUB_BASE: &str = "https://finnhub.io/api/v1";

pub const BACKEND_URL_ENV: &str = "SP_RANKING_BACKEND_URL";
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// Page sizes the results table offers.
pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// What happens to the page index when filters or the formula mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagePolicy {
    /// Jump back to page 0 so the new result set is never rendered out of range.
    #[default]
    ResetOnQueryChange,
    /// Keep the current page index, even if it is past the end of the new result set.
    Preserve,
}

/// Session configuration, built once and shared with every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL without trailing slash. `None` means offline mode.
    pub backend_url: Option<String>,
    pub quote_base_url: String,
    pub quote_api_key: Option<String>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Delay before the single refresh when a run start returns no run id.
    pub fallback_refresh_delay: Duration,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub page_size: usize,
    pub page_policy: PagePolicy,
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            quote_base_url: FINNHUB_BASE.to_string(),
            quote_api_key: None,
            timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(2),
            fallback_refresh_delay: Duration::from_secs(3),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: Duration::from_millis(300),
            page_size: DEFAULT_PAGE_SIZE,
            page_policy: PagePolicy::default(),
            export_dir: default_export_dir(),
        }
    }
}

impl Config {
    /// Read the backend URL and quote API key from the environment.
    ///
    /// This is the only place the crate touches the environment; call it once
    /// at startup and pass the result to [`RankingSdk::builder`](crate::RankingSdk::builder).
    pub fn from_env() -> Self {
        Self {
            backend_url: std::env::var(BACKEND_URL_ENV)
                .ok()
                .and_then(|u| normalize_base_url(&u)),
            quote_api_key: std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Whether the quote-provider fallback can run at all.
    pub fn has_quote_api_key(&self) -> bool {
        self.quote_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Strip trailing slashes; an empty result means "not configured".
pub fn normalize_base_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn default_export_dir() -> PathBuf {
    if let Some(dir) = dirs::download_dir() {
        dir
    } else {
        PathBuf::from(".")
    }
}

