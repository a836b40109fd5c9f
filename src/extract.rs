use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::fetch::RawPage;
use crate::sites::SiteProfile;

/// Where a rule reads its value from once the selector matches.
#[derive(Debug, Clone)]
pub enum Target {
    /// Concatenated text nodes of the element.
    Text,
    /// First non-empty attribute from the list.
    Attr(&'static [&'static str]),
}

/// One step of a selector cascade. Rules are tried in declaration order and
/// the first one yielding a valid value wins.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    selector: Selector,
    target: Target,
}

impl ExtractionRule {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: parse_selector(selector),
            target: Target::Text,
        }
    }

    pub fn attr(selector: &str, attrs: &'static [&'static str]) -> Self {
        Self {
            selector: parse_selector(selector),
            target: Target::Attr(attrs),
        }
    }
}

// Rule tables are static data; a malformed selector is a programming error.
fn parse_selector(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("bad selector '{selector}': {e:?}"))
}

/// Which product field a cascade is extracting. Drives validation and how
/// text nodes are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Price,
    Image,
}

impl FieldKind {
    fn is_valid(&self, value: &str) -> bool {
        match self {
            // Too-short strings are nav labels, too-long ones are page dumps
            FieldKind::Title => (5..=300).contains(&value.chars().count()),
            FieldKind::Price => value.chars().any(|c| c.is_ascii_digit()),
            FieldKind::Image => {
                (value.starts_with("http://") || value.starts_with("https://"))
                    && !value.starts_with("data:")
            }
        }
    }

    /// Price keeps the node structure visible as line breaks so the
    /// normalizer can recognize split integer/cents markup.
    fn join(&self) -> &'static str {
        match self {
            FieldKind::Price => "\n",
            _ => " ",
        }
    }
}

fn element_value(el: ElementRef<'_>, target: &Target, kind: FieldKind) -> Option<String> {
    match target {
        Target::Text => {
            let joined = el
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(kind.join());
            let joined = joined.trim().to_string();
            (!joined.is_empty()).then_some(joined)
        }
        Target::Attr(attrs) => attrs
            .iter()
            .filter_map(|a| el.value().attr(a))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string),
    }
}

/// Run a cascade over the document. Within one rule, candidate elements are
/// visited in document order; the first valid value ends the search. Later
/// rules are never consulted after a valid match.
pub fn extract_field(doc: &Html, rules: &[ExtractionRule], kind: FieldKind) -> Option<String> {
    for rule in rules {
        for el in doc.select(&rule.selector) {
            if let Some(value) = element_value(el, &rule.target, kind) {
                if kind.is_valid(&value) {
                    return Some(value);
                }
                debug!("rejected {kind:?} candidate: '{value}'");
            }
        }
    }
    None
}

/// Raw field values pulled from one page, before price normalization.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub price_text: Option<String>,
    pub image_url: Option<String>,
}

/// Parse once, run all three cascades. Synchronous on purpose: the parsed
/// document is not `Send` and must not live across an await point.
pub fn extract_fields(page: &RawPage, profile: &SiteProfile) -> ExtractedFields {
    let doc = Html::parse_document(&page.html);
    ExtractedFields {
        title: extract_field(&doc, &profile.title_rules, FieldKind::Title),
        price_text: extract_field(&doc, &profile.price_rules, FieldKind::Price),
        image_url: extract_field(&doc, &profile.image_rules, FieldKind::Image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn first_rule_wins_over_later_rules() {
        let d = doc("<h1 id='a'>Primary product name</h1><h1 class='b'>Secondary name here</h1>");
        let rules = vec![ExtractionRule::text("#a"), ExtractionRule::text(".b")];
        assert_eq!(
            extract_field(&d, &rules, FieldKind::Title).as_deref(),
            Some("Primary product name")
        );
    }

    #[test]
    fn invalid_match_falls_through_to_next_rule() {
        // "Menu" fails the length check, so the cascade moves on
        let d = doc("<span id='a'>Menu</span><h1 id='b'>Echo Dot 5ª geração</h1>");
        let rules = vec![ExtractionRule::text("#a"), ExtractionRule::text("#b")];
        assert_eq!(
            extract_field(&d, &rules, FieldKind::Title).as_deref(),
            Some("Echo Dot 5ª geração")
        );
    }

    #[test]
    fn document_order_within_one_rule() {
        let d = doc("<p class='t'>First long enough</p><p class='t'>Second long enough</p>");
        let rules = vec![ExtractionRule::text(".t")];
        assert_eq!(
            extract_field(&d, &rules, FieldKind::Title).as_deref(),
            Some("First long enough")
        );
    }

    #[test]
    fn price_text_nodes_join_with_newline() {
        let d = doc("<div class='p'><span>R$ 399</span><sup>99</sup></div>");
        let rules = vec![ExtractionRule::text(".p")];
        assert_eq!(
            extract_field(&d, &rules, FieldKind::Price).as_deref(),
            Some("R$ 399\n99")
        );
    }

    #[test]
    fn price_requires_a_digit() {
        let d = doc("<div class='p'>Consulte o preço</div>");
        let rules = vec![ExtractionRule::text(".p")];
        assert_eq!(extract_field(&d, &rules, FieldKind::Price), None);
    }

    #[test]
    fn attr_rule_prefers_first_listed_attribute() {
        let d = doc("<img id='i' data-a-hires='https://cdn/hi.jpg' src='https://cdn/lo.jpg'>");
        let rules = vec![ExtractionRule::attr("#i", &["data-a-hires", "src"])];
        assert_eq!(
            extract_field(&d, &rules, FieldKind::Image).as_deref(),
            Some("https://cdn/hi.jpg")
        );
    }

    #[test]
    fn data_uri_image_rejected() {
        let d = doc("<img id='i' src='data:image/gif;base64,R0lGOD'>");
        let rules = vec![ExtractionRule::attr("#i", &["src"])];
        assert_eq!(extract_field(&d, &rules, FieldKind::Image), None);
    }

    #[test]
    fn relative_image_url_rejected() {
        let d = doc("<img id='i' src='/static/img.jpg'>");
        let rules = vec![ExtractionRule::attr("#i", &["src"])];
        assert_eq!(extract_field(&d, &rules, FieldKind::Image), None);
    }

    #[test]
    fn title_length_bounds() {
        assert!(!FieldKind::Title.is_valid("abcd"));
        assert!(FieldKind::Title.is_valid("abcde"));
        let long = "x".repeat(301);
        assert!(!FieldKind::Title.is_valid(&long));
    }

    #[test]
    fn no_match_yields_none() {
        let d = doc("<p>nothing relevant</p>");
        let rules = vec![ExtractionRule::text("#missing")];
        assert_eq!(extract_field(&d, &rules, FieldKind::Title), None);
    }
}
