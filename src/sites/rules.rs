//! Per-retailer rule tables. Selector cascades run top to bottom; put the
//! most specific current markup first and legacy layouts after it.

use crate::extract::ExtractionRule;
use crate::fetch::{LinkThrough, StrategyKind};

use super::{SiteId, SiteProfile};

fn text_rules(selectors: &[&str]) -> Vec<ExtractionRule> {
    selectors.iter().map(|s| ExtractionRule::text(s)).collect()
}

pub(super) fn all() -> Vec<SiteProfile> {
    vec![mercadolivre(), amazon(), shopee(), magazineluiza()]
}

fn mercadolivre() -> SiteProfile {
    SiteProfile {
        id: SiteId::Mercadolivre,
        domains: &["mercadolivre.com", "mercadolivre.com.br", "ml.com.br", "ml.com"],
        match_full_url: false,
        preferred: StrategyKind::Rendered,
        link_through: None,
        title_rules: text_rules(&[
            ".poly-component__title",
            "h1.ui-pdp-title",
            ".ui-pdp-title",
        ]),
        price_rules: text_rules(&[
            ".poly-price__current .andes-money-amount--cents-superscript .andes-money-amount__fraction",
            ".poly-price__current .andes-money-amount__fraction",
            ".ui-pdp-price__current .andes-money-amount__fraction",
        ]),
        image_rules: vec![
            ExtractionRule::attr(".poly-component__picture", &["src", "data-src"]),
            ExtractionRule::attr(".ui-pdp-gallery__figure__image", &["src", "data-src"]),
            ExtractionRule::attr(r#"img[src*="http2.mlstatic.com"]"#, &["src", "data-src"]),
        ],
    }
}

fn amazon() -> SiteProfile {
    SiteProfile {
        id: SiteId::Amazon,
        domains: &["amazon.com.br", "amzn.to"],
        match_full_url: false,
        preferred: StrategyKind::Rendered,
        link_through: None,
        title_rules: text_rules(&[
            "#productTitle",
            "h1#productTitle",
            ".a-size-large.product-title-word-break",
            "h1.a-size-large",
            "h1[data-asin]",
        ]),
        price_rules: text_rules(&[
            ".a-price.aok-align-center.reinventPricePriceToPayMargin.priceToPay",
            ".apexPriceToPay .a-price-whole",
            ".a-price-current",
            ".a-price .a-offscreen",
        ]),
        image_rules: vec![
            ExtractionRule::attr("#landingImage", &["src", "data-a-hires"]),
            ExtractionRule::attr(".a-dynamic-image", &["src", "data-src"]),
            ExtractionRule::attr("img[data-a-hires]", &["data-a-hires", "src"]),
        ],
    }
}

fn shopee() -> SiteProfile {
    SiteProfile {
        id: SiteId::Shopee,
        domains: &["shopee.com.br", "s.shopee.com.br"],
        match_full_url: false,
        preferred: StrategyKind::Rendered,
        link_through: None,
        title_rules: text_rules(&[
            r#"span[data-testid="pdp-product-title"]"#,
            ".product-briefing__title",
            "h1",
        ]),
        price_rules: text_rules(&[
            r#"span[data-testid="pdp-price"]"#,
            ".current-price",
            ".product-briefing__price .current-price",
        ]),
        image_rules: vec![
            ExtractionRule::attr(r#"img[data-testid="pdp-product-image"]"#, &["src", "data-src"]),
            ExtractionRule::attr(".product-briefing__image", &["src", "data-src"]),
            ExtractionRule::attr(r#"img[src*="susercontent"]"#, &["src", "data-src"]),
        ],
    }
}

fn magazineluiza() -> SiteProfile {
    SiteProfile {
        id: SiteId::Magazineluiza,
        // Affiliate redirectors hide the store behind a path segment, so the
        // full-URL pass applies here.
        domains: &[
            "magazineluiza.com.br",
            "magalu.com.br",
            "magazineluiza.com",
            "divulgador.magalu.com",
            "magalu",
        ],
        match_full_url: true,
        preferred: StrategyKind::Rendered,
        // Divulgador card pages only carry a thumbnail; the real product
        // data lives behind the /p/ link on the card.
        link_through: Some(LinkThrough {
            url_markers: &["magazineluiza.com.br/p/", "magalu.com.br/p/"],
        }),
        title_rules: text_rules(&[
            r#"h1[data-testid="heading-product-title"]"#,
            r#"h2[data-testid="heading-product-title"]"#,
            r#"[data-testid="product-title"]"#,
            r#"[data-testid="heading-product"]"#,
            ".product-title",
            ".product-name",
            r#"h2[data-testid="heading"]"#,
            r#"h1[data-testid="heading"]"#,
            "h2.break-words",
            "h1",
        ]),
        price_rules: text_rules(&[
            r#"p[data-testid="price-value"]"#,
            r#"p[data-testid="price-original"]"#,
            r#"[data-testid="price-value"]"#,
            r#"[data-testid="price"]"#,
            r#"[data-testid="price-current"]"#,
            ".price-current",
            ".price-value",
            ".product-price",
            ".text-on-surface-2.font-xlg-bold",
            ".text-on-surface-2.font-2xlg-bold",
            r#"[data-testid*="price"]"#,
        ]),
        image_rules: vec![
            ExtractionRule::attr(
                r#"img[data-testid="image-selected-thumbnail"]"#,
                &["src", "data-src"],
            ),
            ExtractionRule::attr(r#"img[data-testid="media-gallery-image"]"#, &["src", "data-src"]),
            ExtractionRule::attr(r#"img[data-testid="image"]"#, &["src", "data-src"]),
            ExtractionRule::attr(r#"img[data-testid="product-image"]"#, &["src", "data-src"]),
            ExtractionRule::attr(r#"img[alt*="produto" i]"#, &["src", "data-src"]),
            ExtractionRule::attr(r#"img[src*="mlcdn.com.br"]"#, &["src", "data-src"]),
            ExtractionRule::attr(r#"img[src*="magazineluiza.com.br"]"#, &["src", "data-src"]),
        ],
    }
}
