use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{info, warn};

use crate::block::is_blocked;
use crate::config::ScraperConfig;
use crate::extract::extract_fields;
use crate::fetch::{
    BrowserFetcher, FetchError, HttpFetcher, LinkThrough, PageFetcher, RawPage, StrategyKind,
};
use crate::outcome::{ExtractionOutcome, FailureKind, ProductRecord, ScrapeFailure};
use crate::price;
use crate::sites::{self, SiteId, SiteProfile};

/// Drives one URL through classify, fetch, block check, extract and
/// assemble. Generic over its two strategies so tests can substitute mocks.
pub struct Orchestrator<L = HttpFetcher, R = BrowserFetcher> {
    config: ScraperConfig,
    lightweight: L,
    rendered: R,
}

impl Orchestrator {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            lightweight: HttpFetcher::new(),
            rendered: BrowserFetcher::new(),
        }
    }

    /// Shut the browser session down. Safe to call when none was started.
    pub async fn close(&self) {
        self.rendered.close().await;
    }
}

impl<L: PageFetcher, R: PageFetcher> Orchestrator<L, R> {
    pub fn with_strategies(config: ScraperConfig, lightweight: L, rendered: R) -> Self {
        Self {
            config,
            lightweight,
            rendered,
        }
    }

    /// Extract product data from one URL. Infallible at the type level:
    /// every fault becomes a coded `ScrapeFailure`.
    pub async fn extract(&self, url: &str) -> ExtractionOutcome {
        let site = sites::classify(url);
        info!("site '{}' for {url}", site.as_str());

        match AssertUnwindSafe(self.extract_inner(url, site))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let msg = panic_message(&panic);
                warn!("extraction panicked for {url}: {msg}");
                ExtractionOutcome::Failure(ScrapeFailure::new(
                    FailureKind::ScrapeException,
                    site,
                    format!("unexpected fault: {msg}"),
                    None,
                ))
            }
        }
    }

    async fn extract_inner(&self, url: &str, site: SiteId) -> ExtractionOutcome {
        let Some(profile) = sites::profile(site) else {
            return ExtractionOutcome::Failure(ScrapeFailure::new(
                FailureKind::SiteUnsupported,
                site,
                format!("no extraction rules for {url}"),
                None,
            ));
        };

        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }

        let mut last_failure: Option<ScrapeFailure> = None;
        for strategy in self.strategy_order(profile) {
            match self.attempt(url, site, profile, strategy).await {
                Ok(record) => return ExtractionOutcome::Success(record),
                Err(failure) => {
                    warn!(
                        "{} attempt failed for {url}: {} ({})",
                        strategy.as_str(),
                        failure.error,
                        failure.error_code
                    );
                    last_failure = Some(failure);
                }
            }
        }

        // Unreachable fallback: strategy_order is never empty
        let failure = last_failure.unwrap_or_else(|| {
            ScrapeFailure::new(FailureKind::ScrapeException, site, "no strategy ran", None)
        });
        ExtractionOutcome::Failure(failure)
    }

    /// Preferred strategy first, then the one not yet tried. Restricted
    /// mode pins the order to lightweight only.
    fn strategy_order(&self, profile: &SiteProfile) -> Vec<StrategyKind> {
        if !self.config.allow_rendered {
            return vec![StrategyKind::Lightweight];
        }
        let first = if self.config.prefer_rendered {
            profile.preferred
        } else {
            StrategyKind::Lightweight
        };
        let second = match first {
            StrategyKind::Lightweight => StrategyKind::Rendered,
            StrategyKind::Rendered => StrategyKind::Lightweight,
        };
        vec![first, second]
    }

    async fn attempt(
        &self,
        url: &str,
        site: SiteId,
        profile: &SiteProfile,
        strategy: StrategyKind,
    ) -> Result<ProductRecord, ScrapeFailure> {
        let follow = profile.link_through.as_ref();
        let mut page = self
            .fetch_with(strategy, url, follow)
            .await
            .map_err(|e| failure_from_fetch(e, site))?;

        if is_blocked(&page.html) {
            // One settle-and-refetch before giving up on this strategy
            info!("block markers on {url} via {}, retrying once", strategy.as_str());
            tokio::time::sleep(self.config.settle_delay).await;
            page = self
                .fetch_with(strategy, url, follow)
                .await
                .map_err(|e| failure_from_fetch(e, site))?;
            if is_blocked(&page.html) {
                let kind = match strategy {
                    StrategyKind::Rendered => FailureKind::Captcha,
                    StrategyKind::Lightweight => FailureKind::RequestsBlocked,
                };
                return Err(ScrapeFailure::new(
                    kind,
                    site,
                    "page is behind a bot challenge",
                    Some(context(&page)),
                ));
            }
        }

        let fields = extract_fields(&page, profile);
        let mut record = ProductRecord::empty(url, &page.resolved_url);
        record.title = fields.title;
        if let Some(text) = fields.price_text {
            let (display, value) = price::normalize(&text);
            if value.is_some() {
                record.price = Some(display);
                record.price_value = value;
            }
        }
        record.image_url = fields.image_url;

        if record.is_empty() {
            return Err(ScrapeFailure::new(
                FailureKind::NoData,
                site,
                "no product fields extracted",
                Some(context(&page)),
            ));
        }

        info!(
            "extracted from {url} via {}: title={} price={} image={}",
            strategy.as_str(),
            record.title.is_some(),
            record.price.is_some(),
            record.image_url.is_some()
        );
        Ok(record)
    }

    async fn fetch_with(
        &self,
        strategy: StrategyKind,
        url: &str,
        follow: Option<&LinkThrough>,
    ) -> Result<RawPage, FetchError> {
        match strategy {
            StrategyKind::Lightweight => self.lightweight.fetch(url, follow).await,
            StrategyKind::Rendered => self.rendered.fetch(url, follow).await,
        }
    }
}

fn failure_from_fetch(error: FetchError, site: SiteId) -> ScrapeFailure {
    let (kind, details) = match &error {
        FetchError::NonOkStatus { status, url } => {
            (FailureKind::Non200, Some(format!("status={status} url={url}")))
        }
        FetchError::Network(_) => (FailureKind::RequestsException, None),
        FetchError::Navigation(_) => (FailureKind::NavFail, None),
        FetchError::Session(_) => (FailureKind::WebdriverUnavailable, None),
    };
    ScrapeFailure::new(kind, site, error.to_string(), details)
}

fn context(page: &RawPage) -> String {
    let status = page
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "strategy={} url={} status={} elapsed_ms={} nav_timed_out={}",
        page.via.as_str(),
        page.resolved_url,
        status,
        page.elapsed.as_millis(),
        page.nav_timed_out
    )
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
