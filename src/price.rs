use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s[-\u{2013}]\s").unwrap());

/// Normalize free-form price text into a Brazilian display string and a
/// numeric value. Never fails: text that carries no parseable number comes
/// back unchanged with no value.
pub fn normalize(text: &str) -> (String, Option<f64>) {
    let original = text.trim().to_string();
    if original.is_empty() {
        return (original, None);
    }
    let had_newline = text.contains('\n') || text.contains('\r');

    // Price ranges ("R$ 10,00 - R$ 20,00") keep only the first segment
    let segment = RANGE_RE.split(text).next().unwrap_or(text);

    let cleaned = clean_digits(segment);
    if cleaned.is_empty() {
        return (original, None);
    }
    let had_separator = cleaned.contains('.') || cleaned.contains(',');

    let canonical = disambiguate(&cleaned);
    let Ok(mut value) = canonical.parse::<f64>() else {
        debug!("price text '{}' did not parse as a number", original);
        return (original, None);
    };

    // Some sources render minor units as a bare digit run ("R$ 399,99"
    // arriving as "39999" split across DOM nodes). Known accuracy risk for
    // genuine 4-5 digit whole-unit prices.
    if value >= 1000.0 && !had_separator {
        let int_digits = (value.trunc() as u64).to_string().len();
        if had_newline || int_digits == 4 || int_digits == 5 {
            value /= 100.0;
            debug!("minor-unit correction applied: '{}' -> {}", original, value);
        }
    }

    (format_brl(value), Some(value))
}

/// Keep digits, comma and period; collapse runs of consecutive separators
/// down to the last one seen (malformed extraction can double them).
fn clean_digits(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep: Option<char> = None;
    for c in text.chars() {
        if c.is_ascii_digit() {
            if let Some(sep) = pending_sep.take() {
                out.push(sep);
            }
            out.push(c);
        } else if c == '.' || c == ',' {
            pending_sep = Some(c);
        }
    }
    out
}

/// Resolve comma/period ambiguity into a plain "1234.56" form.
fn disambiguate(clean: &str) -> String {
    let has_comma = clean.contains(',');
    let has_dot = clean.contains('.');

    if has_comma && has_dot {
        // The later separator is the decimal one
        let last_comma = clean.rfind(',');
        let last_dot = clean.rfind('.');
        if last_comma > last_dot {
            // Brazilian: "1.234,56"
            clean.replace('.', "").replace(',', ".")
        } else {
            // American: "1,234.56"
            clean.replace(',', "")
        }
    } else if has_dot {
        let parts: Vec<&str> = clean.split('.').collect();
        if parts.len() > 2 || (parts.len() == 2 && parts[1].len() == 3) {
            // "1.234" or "1.234.567" are thousands groupings
            clean.replace('.', "")
        } else {
            clean.to_string()
        }
    } else if has_comma {
        let parts: Vec<&str> = clean.split(',').collect();
        if parts.len() == 2 && (1..=2).contains(&parts[1].len()) {
            // "99,9" / "99,90" are decimals
            clean.replace(',', ".")
        } else {
            clean.replace(',', "")
        }
    } else {
        clean.to_string()
    }
}

/// Brazilian display form: period for thousands, comma for decimals,
/// two decimal digits, "R$ " prefix.
fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let int_part = (cents / 100).to_string();
    let frac = cents % 100;

    let bytes = int_part.as_bytes();
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*b as char);
    }

    format!("R$ {},{:02}", grouped, frac)
}
