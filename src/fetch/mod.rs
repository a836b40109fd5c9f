pub mod browser;
pub mod http;

use std::time::Duration;

use thiserror::Error;

pub use browser::BrowserFetcher;
pub use http::HttpFetcher;

/// The two ways a page can be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Plain HTTP GET, no JavaScript.
    Lightweight,
    /// Headless Chrome with stealth hardening.
    Rendered,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Lightweight => "lightweight",
            StrategyKind::Rendered => "rendered",
        }
    }
}

/// HTML plus the request metadata downstream stages report on.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub html: String,
    /// URL after redirects; the browser path reports the address bar URL.
    pub resolved_url: String,
    /// HTTP status when the strategy observes one.
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub via: StrategyKind,
    /// Navigation hit its deadline but the page content was taken anyway.
    pub nav_timed_out: bool,
}

/// Fetch faults, classified by what the orchestrator should do about them.
/// Clone so tests can hand the same canned fault to repeated calls.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("unexpected status {status} from {url}")]
    NonOkStatus { status: u16, url: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("browser session unavailable: {0}")]
    Session(String),
}

/// Follow-through for affiliate card pages: once the first page settles,
/// navigate to the first anchor whose href carries one of these markers
/// before extracting. Card pages link to the canonical product page, which
/// is where the real title, price and gallery live.
#[derive(Debug, Clone, Copy)]
pub struct LinkThrough {
    /// Substrings identifying a canonical product URL.
    pub url_markers: &'static [&'static str],
}

/// A page-fetch strategy. Object safety is not needed; the orchestrator is
/// generic over its two strategies. `follow` is best-effort; strategies
/// that cannot navigate ignore it.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    fn kind(&self) -> StrategyKind;
    async fn fetch(&self, url: &str, follow: Option<&LinkThrough>) -> Result<RawPage, FetchError>;
}
