mod rules;

use std::sync::LazyLock;

use serde::Serialize;
use url::Url;

use crate::extract::ExtractionRule;
use crate::fetch::{LinkThrough, StrategyKind};

/// Supported retailers plus a catch-all for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteId {
    Mercadolivre,
    Amazon,
    Shopee,
    Magazineluiza,
    Unknown,
}

impl SiteId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteId::Mercadolivre => "mercadolivre",
            SiteId::Amazon => "amazon",
            SiteId::Shopee => "shopee",
            SiteId::Magazineluiza => "magazineluiza",
            SiteId::Unknown => "unknown",
        }
    }

    /// Uppercase form used in error codes.
    pub fn code_prefix(&self) -> String {
        self.as_str().to_uppercase()
    }
}

/// Everything the pipeline knows about one retailer: how to recognize its
/// URLs, which fetch strategy it wants, and the rule cascades per field.
pub struct SiteProfile {
    pub id: SiteId,
    pub domains: &'static [&'static str],
    /// Also match the pattern anywhere in the full URL, not just the host.
    /// Needed for affiliate redirectors that bury the brand in the path.
    pub match_full_url: bool,
    pub preferred: StrategyKind,
    /// For retailers reached through affiliate card pages: markers of the
    /// canonical product URL the rendered fetch should follow to.
    pub link_through: Option<LinkThrough>,
    pub title_rules: Vec<ExtractionRule>,
    pub price_rules: Vec<ExtractionRule>,
    pub image_rules: Vec<ExtractionRule>,
}

static PROFILES: LazyLock<Vec<SiteProfile>> = LazyLock::new(rules::all);

pub fn profiles() -> &'static [SiteProfile] {
    &PROFILES
}

/// Profile lookup; `Unknown` has no profile.
pub fn profile(id: SiteId) -> Option<&'static SiteProfile> {
    profiles().iter().find(|p| p.id == id)
}

fn host_of(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        return parsed.host_str().map(str::to_string);
    }
    // Scheme-less input: take everything up to the first path/query char
    let stripped = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    stripped
        .split(['/', '?', '#'])
        .next()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

/// Classify a URL by host substring, in profile priority order. Profiles
/// flagged `match_full_url` get a second pass against the whole URL, so
/// shortener and affiliate links still resolve.
pub fn classify(url: &str) -> SiteId {
    let lower = url.trim().to_lowercase();
    if lower.is_empty() {
        return SiteId::Unknown;
    }
    let host = host_of(&lower).unwrap_or_default();

    for p in profiles() {
        if p.domains.iter().any(|d| host.contains(d)) {
            return p.id;
        }
    }
    for p in profiles().iter().filter(|p| p.match_full_url) {
        if p.domains.iter().any(|d| lower.contains(d)) {
            return p.id;
        }
    }
    SiteId::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_amazon_host() {
        assert_eq!(classify("https://www.amazon.com.br/dp/B0ABC123"), SiteId::Amazon);
        assert_eq!(classify("https://amzn.to/3xYz"), SiteId::Amazon);
    }

    #[test]
    fn classifies_mercadolivre_host() {
        assert_eq!(
            classify("https://produto.mercadolivre.com.br/MLB-123"),
            SiteId::Mercadolivre
        );
        assert_eq!(classify("https://www.ml.com.br/p/1"), SiteId::Mercadolivre);
    }

    #[test]
    fn classifies_shopee_shortlink() {
        assert_eq!(classify("https://s.shopee.com.br/abc"), SiteId::Shopee);
    }

    #[test]
    fn magalu_affiliate_matches_on_full_url() {
        assert_eq!(
            classify("https://divulgador.magalu.com/xyz"),
            SiteId::Magazineluiza
        );
        // Brand only appears in the path of a redirector URL
        assert_eq!(
            classify("https://redirect.example.com/go?to=magalu"),
            SiteId::Magazineluiza
        );
    }

    #[test]
    fn unrelated_host_is_unknown() {
        assert_eq!(classify("https://example.org/product/1"), SiteId::Unknown);
        assert_eq!(classify(""), SiteId::Unknown);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("HTTPS://WWW.AMAZON.COM.BR/DP/X"), SiteId::Amazon);
    }

    #[test]
    fn scheme_less_url_still_classifies() {
        assert_eq!(classify("www.shopee.com.br/item/123"), SiteId::Shopee);
    }

    #[test]
    fn unknown_has_no_profile() {
        assert!(profile(SiteId::Unknown).is_none());
        assert!(profile(SiteId::Amazon).is_some());
    }

    #[test]
    fn priority_order_is_stable() {
        let ids: Vec<SiteId> = profiles().iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![
                SiteId::Mercadolivre,
                SiteId::Amazon,
                SiteId::Shopee,
                SiteId::Magazineluiza
            ]
        );
    }
}
