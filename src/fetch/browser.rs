use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{FetchError, LinkThrough, PageFetcher, RawPage, StrategyKind};

const NAV_TIMEOUT: Duration = Duration::from_secs(20);
const READY_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL: Duration = Duration::from_millis(250);
const SCROLL_SETTLE: Duration = Duration::from_millis(800);

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const BROWSER_TIMEZONE: &str = "America/Sao_Paulo";

// Injected before any page script runs. Retailers in this set fingerprint
// for headless automation; the overrides match a stock pt-BR desktop Chrome.
const STEALTH_JS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
    Object.defineProperty(navigator, 'languages', { get: () => ['pt-BR', 'pt', 'en-US', 'en'] });
    window.chrome = { runtime: {} };
"#;

struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl Session {
    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Rendered strategy: a persistent headless Chrome session, created on first
/// use and kept alive across calls. The lock serializes rendered fetches;
/// retailers in this set respond badly to parallel automation anyway.
pub struct BrowserFetcher {
    session: Mutex<Option<Session>>,
}

impl BrowserFetcher {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    /// Tear the session down. Call before process exit; an unclosed browser
    /// leaves a Chrome process behind.
    pub async fn close(&self) {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            session.shutdown().await;
        }
    }

    async fn launch() -> Result<Session, FetchError> {
        let args = [
            "--disable-blink-features=AutomationControlled",
            "--disable-infobars",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--no-sandbox",
            "--window-size=1920,1080",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-background-networking",
            "--no-first-run",
            "--lang=pt-BR",
        ];

        let config = BrowserConfig::builder()
            .viewport(Some(Viewport {
                width: 1920,
                height: 1080,
                device_scale_factor: Some(1.0),
                ..Default::default()
            }))
            .args(args)
            .arg(format!("--user-agent={BROWSER_UA}"))
            .build()
            .map_err(FetchError::Session)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Session(e.to_string()))?;
        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

        debug!("headless browser session started");
        Ok(Session {
            browser,
            handler: handle,
        })
    }

    /// Get a hardened blank page from the session, creating or recreating
    /// the session as needed. One relaunch attempt on a dead handle.
    async fn ensure_page(guard: &mut Option<Session>) -> Result<Page, FetchError> {
        if guard.is_none() {
            *guard = Some(Self::launch().await?);
        }
        let session = guard.as_mut().ok_or_else(|| {
            FetchError::Session("browser session missing after launch".to_string())
        })?;

        match Self::open_page(session).await {
            Ok(page) => Ok(page),
            Err(first) => {
                warn!("browser handle dead ({first}), relaunching");
                if let Some(mut dead) = guard.take() {
                    dead.shutdown().await;
                }
                *guard = Some(Self::launch().await?);
                let session = guard.as_mut().ok_or_else(|| {
                    FetchError::Session("browser session missing after relaunch".to_string())
                })?;
                Self::open_page(session)
                    .await
                    .map_err(|e| FetchError::Navigation(e.to_string()))
            }
        }
    }

    async fn open_page(session: &Session) -> Result<Page, FetchError> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Navigation(e.to_string()))?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_JS))
            .await
            .map_err(|e| FetchError::Navigation(e.to_string()))?;
        if let Err(e) = page
            .execute(SetTimezoneOverrideParams::new(BROWSER_TIMEZONE))
            .await
        {
            debug!("timezone override failed: {e}");
        }
        Ok(page)
    }

    async fn render(
        page: &Page,
        url: &str,
        follow: Option<&LinkThrough>,
    ) -> Result<RawPage, FetchError> {
        let start = Instant::now();

        // Heavy pages blow past the navigation deadline while the product
        // markup is already in the DOM; take what loaded instead of failing.
        let mut nav_timed_out = false;
        match tokio::time::timeout(NAV_TIMEOUT, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(FetchError::Navigation(e.to_string())),
            Err(_) => {
                warn!("navigation to {url} exceeded {}s, proceeding", NAV_TIMEOUT.as_secs());
                nav_timed_out = true;
            }
        }

        Self::wait_for_ready(page).await;

        if let Some(follow) = follow {
            Self::follow_product_link(page, follow).await;
        }

        // Scroll down and back to trigger lazy-loaded galleries and prices
        let _ = page.evaluate("window.scrollTo(0, document.body.scrollHeight)").await;
        tokio::time::sleep(SCROLL_SETTLE).await;
        let _ = page.evaluate("window.scrollTo(0, 0)").await;
        tokio::time::sleep(SCROLL_SETTLE).await;

        let html = page
            .content()
            .await
            .map_err(|e| FetchError::Navigation(e.to_string()))?;
        let resolved_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(RawPage {
            html,
            resolved_url,
            status: None,
            elapsed: start.elapsed(),
            via: StrategyKind::Rendered,
            nav_timed_out,
        })
    }

    /// Affiliate card pages carry a link to the canonical product page.
    /// Find it among the page's anchors and navigate there before
    /// extraction; the card itself has a thumbnail at best. Best-effort:
    /// any fault keeps the current page.
    async fn follow_product_link(page: &Page, follow: &LinkThrough) {
        let current = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
            .to_lowercase();
        if follow.url_markers.iter().any(|m| current.contains(m)) {
            return;
        }

        let hrefs: Vec<String> = match page
            .evaluate("Array.from(document.querySelectorAll('a[href]')).map(a => a.href)")
            .await
            .ok()
            .and_then(|v| v.into_value().ok())
        {
            Some(hrefs) => hrefs,
            None => return,
        };
        let Some(target) = pick_product_link(&hrefs, follow.url_markers) else {
            return;
        };

        debug!("following product link {target}");
        match tokio::time::timeout(NAV_TIMEOUT, page.goto(target.as_str())).await {
            Ok(Ok(_)) => Self::wait_for_ready(page).await,
            Ok(Err(e)) => warn!("product link navigation failed: {e}"),
            Err(_) => warn!("product link navigation timed out, keeping card page"),
        }
    }

    async fn wait_for_ready(page: &Page) {
        let deadline = Instant::now() + READY_TIMEOUT;
        while Instant::now() < deadline {
            let state = page
                .evaluate("document.readyState")
                .await
                .ok()
                .and_then(|v| v.into_value::<String>().ok());
            if matches!(state.as_deref(), Some("interactive") | Some("complete")) {
                return;
            }
            tokio::time::sleep(READY_POLL).await;
        }
        debug!("document never reached readiness, continuing anyway");
    }
}

impl Default for BrowserFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher for BrowserFetcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rendered
    }

    async fn fetch(&self, url: &str, follow: Option<&LinkThrough>) -> Result<RawPage, FetchError> {
        // Holding the lock for the whole fetch serializes rendered requests
        let mut guard = self.session.lock().await;
        let page = Self::ensure_page(&mut guard).await?;

        let result = Self::render(&page, url, follow).await;
        if let Err(e) = page.close().await {
            debug!("page close failed: {e}");
        }
        result
    }
}

/// First anchor carrying a canonical product marker wins; hrefs keep the
/// page's anchor order. Case-insensitive, card CDNs mix the casing.
fn pick_product_link(hrefs: &[String], markers: &[&str]) -> Option<String> {
    hrefs
        .iter()
        .find(|href| {
            let lower = href.to_lowercase();
            markers.iter().any(|m| lower.contains(m))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKERS: &[&str] = &["magazineluiza.com.br/p/", "magalu.com.br/p/"];

    #[test]
    fn picks_first_canonical_product_link() {
        let hrefs = vec![
            "https://divulgador.magalu.com/outra-oferta".to_string(),
            "https://www.magazineluiza.com.br/p/geladeira-400l/ge/gela".to_string(),
            "https://www.magalu.com.br/p/fogao-5-bocas/ef/fg5b".to_string(),
        ];
        assert_eq!(
            pick_product_link(&hrefs, MARKERS).as_deref(),
            Some("https://www.magazineluiza.com.br/p/geladeira-400l/ge/gela")
        );
    }

    #[test]
    fn nav_links_without_product_path_are_skipped() {
        let hrefs = vec![
            "https://www.magazineluiza.com.br/".to_string(),
            "https://www.magazineluiza.com.br/busca/geladeira/".to_string(),
        ];
        assert_eq!(pick_product_link(&hrefs, MARKERS), None);
    }

    #[test]
    fn marker_match_ignores_case() {
        let hrefs = vec!["https://WWW.MAGAZINELUIZA.COM.BR/P/item/xx/yy".to_string()];
        assert!(pick_product_link(&hrefs, MARKERS).is_some());
    }

    #[test]
    fn empty_anchor_list_yields_none() {
        assert_eq!(pick_product_link(&[], MARKERS), None);
    }
}
