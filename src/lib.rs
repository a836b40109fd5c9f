//! Product data extraction for Brazilian e-commerce pages.
//!
//! Give [`extract`] a product URL from one of the supported retailers and it
//! returns a [`ProductRecord`] (title, price, image) or a coded
//! [`ScrapeFailure`]. The pipeline classifies the URL, fetches the page with
//! the strategy the site prefers (headless Chrome or plain HTTP), falls back
//! to the other strategy on faults and block pages, then runs the site's
//! selector cascades over the DOM.

pub mod block;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod orchestrator;
pub mod outcome;
pub mod price;
pub mod sites;

pub use config::ScraperConfig;
pub use orchestrator::Orchestrator;
pub use outcome::{ExtractionOutcome, ProductRecord, ScrapeFailure};

/// One-shot extraction with environment-driven configuration. Starts a
/// browser session if needed and tears it down before returning; callers
/// doing many URLs should hold an [`Orchestrator`] instead.
pub async fn extract(url: &str) -> ExtractionOutcome {
    let orchestrator = Orchestrator::new(ScraperConfig::from_env());
    let outcome = orchestrator.extract(url).await;
    orchestrator.close().await;
    outcome
}
