use std::sync::OnceLock;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use reqwest::redirect::Policy;
use tracing::debug;

use super::{FetchError, LinkThrough, PageFetcher, RawPage, StrategyKind};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Lightweight strategy: one GET with browser-like headers. Cheap, but only
/// sees server-rendered markup.
pub struct HttpFetcher {
    client: OnceLock<reqwest::Client>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: OnceLock::new(),
        }
    }

    // Client construction is deferred to the first fetch so a build fault
    // surfaces as a fetch error the orchestrator can route, not a panic in
    // the constructor.
    fn client(&self) -> Result<&reqwest::Client, FetchError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let built = Self::build_client().map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(self.client.get_or_init(|| built))
    }

    fn build_client() -> reqwest::Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .redirect(Policy::limited(10))
            .build()
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher for HttpFetcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Lightweight
    }

    async fn fetch(&self, url: &str, _follow: Option<&LinkThrough>) -> Result<RawPage, FetchError> {
        let start = Instant::now();
        let response = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let resolved_url = response.url().to_string();
        if status != 200 {
            return Err(FetchError::NonOkStatus {
                status,
                url: resolved_url,
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let elapsed = start.elapsed();
        debug!(
            "GET {url} -> {status}, {} bytes in {}ms",
            html.len(),
            elapsed.as_millis()
        );

        Ok(RawPage {
            html,
            resolved_url,
            status: Some(status),
            elapsed,
            via: StrategyKind::Lightweight,
            nav_timed_out: false,
        })
    }
}
