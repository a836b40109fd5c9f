use std::env;
use std::time::Duration;

/// Host-tunable knobs. Everything defaults to the full pipeline; restricted
/// hosts without a usable Chrome set `LOJA_ALLOW_RENDERED=0`.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Start with each site's preferred strategy instead of lightweight.
    pub prefer_rendered: bool,
    /// When false the rendered strategy is never attempted.
    pub allow_rendered: bool,
    /// Pause before each extraction, for hosts pacing a queue of URLs.
    pub request_delay: Duration,
    /// Pause before re-fetching a page that looked blocked.
    pub settle_delay: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            prefer_rendered: true,
            allow_rendered: true,
            request_delay: Duration::ZERO,
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl ScraperConfig {
    /// Read overrides from `LOJA_PREFER_RENDERED`, `LOJA_ALLOW_RENDERED`
    /// and `LOJA_REQUEST_DELAY_SECS`. Unset or unparseable values keep the
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = env::var("LOJA_PREFER_RENDERED") {
            config.prefer_rendered = parse_bool(&v, config.prefer_rendered);
        }
        if let Ok(v) = env::var("LOJA_ALLOW_RENDERED") {
            config.allow_rendered = parse_bool(&v, config.allow_rendered);
        }
        if let Ok(v) = env::var("LOJA_REQUEST_DELAY_SECS") {
            if let Ok(secs) = v.trim().parse::<f64>() {
                config.request_delay = Duration::from_secs_f64(secs.max(0.0));
            }
        }
        config
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
