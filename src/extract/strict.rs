//! Strict JSON extraction.
//!
//! Accepts a bare array of records, or an object whose `records` or
//! `competitors` key holds one. Markdown code fences around the JSON are
//! tolerated. Records missing a name or a description are dropped.

use serde_json::{Map, Value};

use super::normalize::{
    clamp_similarity, clean_name, clean_text, dedupe_by_name, normalize_url, number_from_value,
    to_integer,
};
use crate::core::CompetitorProfile;
use crate::error::ExtractError;

/// Keys accepted for each field, in lookup order.
const NAME_KEYS: &[&str] = &["name", "competitor_name", "company", "company_name"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary"];
const FOUNDED_KEYS: &[&str] = &["founded_year", "founded"];
const EMPLOYEE_KEYS: &[&str] = &["employee_count", "employees"];
const FUNDING_KEYS: &[&str] = &["funding_raised", "funding"];
const REVENUE_KEYS: &[&str] = &["revenue"];
const LINKEDIN_KEYS: &[&str] = &["linkedin_url", "linkedin"];
const WEBSITE_KEYS: &[&str] = &["website_url", "website", "url"];
const FEATURE_KEYS: &[&str] = &["main_features", "features", "key_features"];
const SIMILARITY_KEYS: &[&str] = &["similarity_score", "similarity", "confidence"];

/// Parses `text` as a JSON record list.
///
/// # Errors
///
/// Returns [`ExtractError::Json`] when the text is not JSON and
/// [`ExtractError::UnexpectedShape`] when it holds no record list.
pub fn parse_strict(text: &str) -> Result<Vec<CompetitorProfile>, ExtractError> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => ["records", "competitors"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .ok_or(ExtractError::UnexpectedShape)?,
        _ => return Err(ExtractError::UnexpectedShape),
    };

    let records = items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(record_from_object)
        .collect();

    Ok(dedupe_by_name(records))
}

/// Removes a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[start + 3..];
    // Skip the language tag on the opening fence line.
    let body_start = after_open.find('\n').map_or(after_open.len(), |i| i + 1);
    let body = &after_open[body_start..];

    body.rfind("```").map_or(body, |end| &body[..end]).trim()
}

/// Parses a single JSON object, e.g. a tool-call argument.
#[must_use]
pub fn parse_record(value: &Value) -> Option<CompetitorProfile> {
    value.as_object().and_then(record_from_object)
}

fn record_from_object(obj: &Map<String, Value>) -> Option<CompetitorProfile> {
    let name = clean_name(lookup_str(obj, NAME_KEYS)?);
    let description = clean_text(lookup_str(obj, DESCRIPTION_KEYS)?)?;
    if name.is_empty() {
        return None;
    }

    Some(CompetitorProfile {
        name,
        description: Some(description),
        founded_year: lookup(obj, FOUNDED_KEYS)
            .and_then(number_from_value)
            .and_then(to_integer),
        employee_count: lookup(obj, EMPLOYEE_KEYS)
            .and_then(number_from_value)
            .and_then(to_integer),
        funding_raised: lookup(obj, FUNDING_KEYS).and_then(number_from_value),
        revenue: lookup(obj, REVENUE_KEYS).and_then(number_from_value),
        linkedin_url: lookup_str(obj, LINKEDIN_KEYS).and_then(normalize_url),
        website_url: lookup_str(obj, WEBSITE_KEYS).and_then(normalize_url),
        main_features: lookup(obj, FEATURE_KEYS).and_then(features_text),
        similarity_score: lookup(obj, SIMILARITY_KEYS)
            .filter(|v| !v.is_null())
            .map(|v| clamp_similarity(Some(v))),
    })
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn lookup_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn features_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_text(s),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            clean_text(&joined)
        }
        _ => None,
    }
}
