//! Field normalization shared by the strict and heuristic extractors.
//!
//! Every function here is total: malformed input maps to `None` or to a
//! default, never to a panic.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::{CompetitorProfile, DEFAULT_SIMILARITY};

/// First number in a string plus an optional magnitude suffix.
static NUMBER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(-?\d+(?:\.\d+)?)\s*(%|(?:thousand|million|billion|trillion|mn|bn|k|m|b|t)\b)?",
    )
    .ok()
});

/// Placeholder values models emit for unknown fields.
const UNKNOWN_MARKERS: &[&str] = &["n/a", "na", "unknown", "none", "null", "-", "not available"];

/// Parses the first number in `raw`.
///
/// Currency symbols and thousands separators are ignored. Magnitude
/// suffixes (`K`, `M`, `B`, `million`, ...) scale the value and a trailing
/// `%` divides it by 100. Returns `None` when no number is present.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace([',', '$', '€', '£'], "");
    let re = NUMBER_RE.as_ref()?;
    let caps = re.captures(&cleaned)?;
    let base: f64 = caps.get(1)?.as_str().parse().ok()?;

    let scale = match caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .as_deref()
    {
        Some("%") => 0.01,
        Some("k" | "thousand") => 1e3,
        Some("m" | "mn" | "million") => 1e6,
        Some("b" | "bn" | "billion") => 1e9,
        Some("t" | "trillion") => 1e12,
        _ => 1.0,
    };

    let value = base * scale;
    value.is_finite().then_some(value)
}

/// Reads a number out of a JSON value (numbers and numeric strings).
#[must_use]
pub fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Converts a parsed number into a whole count (year, headcount).
#[must_use]
pub fn to_integer(value: f64) -> Option<i64> {
    if !value.is_finite() || value.abs() > 9.0e15 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(value.round() as i64)
}

/// Clamps a confidence value into `[0, 1]`.
///
/// Absent or non-numeric input yields [`DEFAULT_SIMILARITY`].
#[must_use]
pub fn clamp_similarity(value: Option<&Value>) -> f64 {
    value
        .and_then(number_from_value)
        .map_or(DEFAULT_SIMILARITY, |v| v.clamp(0.0, 1.0))
}

/// Clamps a free-text confidence (`"0.9"`, `"85%"`) into `[0, 1]`.
#[must_use]
pub fn clamp_similarity_text(raw: &str) -> Option<f64> {
    parse_number(raw).map(|v| v.clamp(0.0, 1.0))
}

/// Trims a URL and adds `https://` when it has no scheme.
///
/// Empty strings and placeholders like `N/A` yield `None`, meaning "no
/// URL". Inserts store an absent URL as `""`, so `""` still maps to `""`
/// in the database, and an update never blanks a stored URL.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c| matches!(c, '<' | '>' | '(' | ')' | '"' | '\''));
    if trimmed.is_empty() || is_unknown(trimmed) {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

/// Cleans a free-text field; placeholders and blanks yield `None`.
#[must_use]
pub fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_unknown(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Cleans a company name: strips markdown emphasis and trailing punctuation.
#[must_use]
pub fn clean_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '*' | '_' | '#' | '`'))
        .trim()
        .trim_end_matches(|c| matches!(c, ':' | '.' | ',' | ';'))
        .trim()
        .to_string()
}

/// Drops records whose name repeats an earlier one (case-insensitive).
///
/// The first occurrence wins and input order is preserved.
#[must_use]
pub fn dedupe_by_name(records: Vec<CompetitorProfile>) -> Vec<CompetitorProfile> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.name.trim().to_lowercase()))
        .collect()
}

fn is_unknown(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    UNKNOWN_MARKERS.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("2015", Some(2015.0) ; "plain integer")]
    #[test_case("$25M", Some(25_000_000.0) ; "currency with suffix")]
    #[test_case("1,200 employees", Some(1200.0) ; "thousands separator")]
    #[test_case("$1.5 billion", Some(1_500_000_000.0) ; "word suffix")]
    #[test_case("500+", Some(500.0) ; "plus sign")]
    #[test_case("85%", Some(0.85) ; "percent")]
    #[test_case("Founded in 2015 by two engineers", Some(2015.0) ; "word after year")]
    #[test_case("unknown", None ; "no digits")]
    #[test_case("", None ; "empty")]
    fn test_parse_number(input: &str, expected: Option<f64>) {
        let got = parse_number(input);
        match (got, expected) {
            (Some(g), Some(e)) => assert!((g - e).abs() < 1e-6, "{input}: {g} != {e}"),
            (None, None) => {}
            _ => unreachable!("{input}: got {got:?}, expected {expected:?}"),
        }
    }

    #[test_case(Some(json!(-1)), 0.0 ; "below range")]
    #[test_case(Some(json!(0.5)), 0.5 ; "in range")]
    #[test_case(Some(json!(2)), 1.0 ; "above range")]
    #[test_case(Some(json!("abc")), 0.8 ; "non numeric")]
    #[test_case(None, 0.8 ; "missing")]
    #[test_case(Some(json!(null)), 0.8 ; "null")]
    fn test_clamp_similarity(input: Option<Value>, expected: f64) {
        let got = clamp_similarity(input.as_ref());
        assert!((got - expected).abs() < f64::EPSILON);
    }

    #[test_case("example.com", Some("https://example.com") ; "bare host")]
    #[test_case("  https://example.com  ", Some("https://example.com") ; "trims")]
    #[test_case("http://old.example.com", Some("http://old.example.com") ; "keeps http")]
    #[test_case("", None ; "empty")]
    #[test_case("N/A", None ; "placeholder")]
    fn test_normalize_url(input: &str, expected: Option<&str>) {
        assert_eq!(normalize_url(input).as_deref(), expected);
    }

    #[test]
    fn test_dedupe_keeps_first_case_insensitive() {
        let mut first = CompetitorProfile::named("Stripe");
        first.description = Some("first".to_string());
        let records = vec![
            first,
            CompetitorProfile::named("Adyen"),
            CompetitorProfile::named("stripe"),
        ];
        let deduped = dedupe_by_name(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].description.as_deref(), Some("first"));
        assert_eq!(deduped[1].name, "Adyen");
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("**Stripe**:"), "Stripe");
        assert_eq!(clean_name("  Adyen. "), "Adyen");
    }

    #[test]
    fn test_to_integer_rejects_non_finite() {
        assert_eq!(to_integer(f64::NAN), None);
        assert_eq!(to_integer(2015.4), Some(2015));
    }
}
