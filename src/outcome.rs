use serde::Serialize;

use crate::sites::SiteId;

/// Structured product data extracted from one page. Partial population is
/// valid; a record with all three fields absent is never returned as success.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRecord {
    /// Original input URL, always present.
    pub url: String,
    /// Final URL after redirects.
    pub resolved_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display price in Brazilian format ("R$ 1.234,56").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Set if and only if `price` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductRecord {
    pub fn empty(url: &str, resolved_url: &str) -> Self {
        Self {
            url: url.to_string(),
            resolved_url: resolved_url.to_string(),
            title: None,
            price: None,
            price_value: None,
            image_url: None,
        }
    }

    /// True when no field was extracted at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.price.is_none() && self.image_url.is_none()
    }
}

/// Failure classification. Rendered as a stable string code prefixed with the
/// site identifier, e.g. `AMAZON_CAPTCHA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SiteUnsupported,
    NavFail,
    Captcha,
    NoData,
    Non200,
    RequestsBlocked,
    RequestsException,
    ScrapeException,
    WebdriverUnavailable,
}

impl FailureKind {
    pub fn code(&self, site: SiteId) -> String {
        let prefix = site.code_prefix();
        match self {
            FailureKind::SiteUnsupported => "SITE_UNSUPPORTED".to_string(),
            FailureKind::WebdriverUnavailable => "WEBDRIVER_UNAVAILABLE".to_string(),
            FailureKind::NavFail => format!("{prefix}_NAV_FAIL"),
            FailureKind::Captcha => format!("{prefix}_CAPTCHA"),
            FailureKind::NoData => format!("{prefix}_NO_DATA"),
            FailureKind::Non200 => format!("{prefix}_REQUESTS_NON_200"),
            FailureKind::RequestsBlocked => format!("{prefix}_REQUESTS_BLOCKED"),
            FailureKind::RequestsException => format!("{prefix}_REQUESTS_EXCEPTION"),
            FailureKind::ScrapeException => format!("{prefix}_SCRAPE_EXCEPTION"),
        }
    }
}

/// Terminal failure returned to the caller. Never thrown.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeFailure {
    pub error_code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ScrapeFailure {
    pub fn new(
        kind: FailureKind,
        site: SiteId,
        error: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        Self {
            error_code: kind.code(site),
            error: error.into(),
            details,
        }
    }
}

/// Result of one extraction call. Every path through the orchestrator ends
/// here; no error type crosses this boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Success(ProductRecord),
    Failure(ScrapeFailure),
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }

    pub fn record(&self) -> Option<&ProductRecord> {
        match self {
            ExtractionOutcome::Success(r) => Some(r),
            ExtractionOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ScrapeFailure> {
        match self {
            ExtractionOutcome::Success(_) => None,
            ExtractionOutcome::Failure(f) => Some(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_carry_site_prefix() {
        assert_eq!(FailureKind::Captcha.code(SiteId::Amazon), "AMAZON_CAPTCHA");
        assert_eq!(
            FailureKind::Non200.code(SiteId::Magazineluiza),
            "MAGAZINELUIZA_REQUESTS_NON_200"
        );
        assert_eq!(
            FailureKind::NoData.code(SiteId::Mercadolivre),
            "MERCADOLIVRE_NO_DATA"
        );
    }

    #[test]
    fn global_codes_have_no_prefix() {
        assert_eq!(
            FailureKind::SiteUnsupported.code(SiteId::Unknown),
            "SITE_UNSUPPORTED"
        );
        assert_eq!(
            FailureKind::WebdriverUnavailable.code(SiteId::Shopee),
            "WEBDRIVER_UNAVAILABLE"
        );
    }

    #[test]
    fn failure_serializes_router_fields() {
        let f = ScrapeFailure::new(
            FailureKind::NoData,
            SiteId::Shopee,
            "no product fields extracted",
            Some("status=200".to_string()),
        );
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["error_code"], "SHOPEE_NO_DATA");
        assert_eq!(json["error"], "no product fields extracted");
        assert_eq!(json["details"], "status=200");
    }

    #[test]
    fn empty_record_detection() {
        let mut r = ProductRecord::empty("https://a", "https://a");
        assert!(r.is_empty());
        r.image_url = Some("https://cdn/img.jpg".to_string());
        assert!(!r.is_empty());
    }
}
