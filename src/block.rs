/// Textual signatures of anti-automation challenge pages.
const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "robot check",
    "unusual traffic",
    "access denied",
    "temporarily unavailable",
    "validatecaptcha",
];

/// True when the page is presenting a bot challenge instead of content.
pub fn is_blocked(html: &str) -> bool {
    let lower = html.to_lowercase();
    BLOCK_MARKERS.iter().any(|m| lower.contains(m))
}
