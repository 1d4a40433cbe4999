//! Line-oriented fallback extraction for free-text reports.
//!
//! Each line is matched against [`GRAMMAR`] in order; the first rule that
//! fits decides what the line means. Header rules start a record, field
//! rules fill the current one. A record is emitted when the next header
//! arrives or the input ends.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::{
    clamp_similarity_text, clean_name, clean_text, dedupe_by_name, normalize_url, parse_number,
    to_integer,
};
use crate::core::CompetitorProfile;

/// `COMPETITOR A - Example Corp`, `COMPETITOR 2: Example Corp`
static LETTERED_HEADER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^competitor\s+[a-z0-9]{1,2}\s*[-–—:]\s*(.+)$").ok()
});

/// `Example Corp - Market Leader`
static CATEGORY_HEADER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(.+?)\s*[-–—]\s*(?:market leader|emerging player|technology competitor|direct competitor|indirect competitor)\s*$",
    )
    .ok()
});

/// Category labels that can appear where a name is expected.
const CATEGORY_LABELS: &[&str] = &[
    "market leader",
    "emerging player",
    "technology competitor",
    "direct competitor",
    "indirect competitor",
];

/// Minimum number of characters for a header name to count.
const MIN_NAME_CHARS: usize = 3;

/// A competitor attribute addressed by a field label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `Description:`
    Description,
    /// `Website:`
    Website,
    /// `LinkedIn:`
    LinkedIn,
    /// `Founded:`
    Founded,
    /// `Employees:`
    Employees,
    /// `Funding:`
    Funding,
    /// `Revenue:`
    Revenue,
    /// `Features:`
    Features,
    /// `Similarity:`
    Similarity,
}

/// One rule of the line grammar.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// `<label>: <name>` starts a record.
    LabeledHeader(&'static [&'static str]),
    /// `COMPETITOR <letter> - <name>` starts a record.
    LetteredHeader,
    /// `<name> - Market Leader` starts a record.
    CategoryHeader,
    /// `<label>: <value>` sets a field on the current record.
    Field(Field, &'static [&'static str]),
}

/// The ordered line grammar.
pub const GRAMMAR: &[Rule] = &[
    Rule::LabeledHeader(&["competitor", "company", "name", "company name"]),
    Rule::Field(Field::Description, &["description", "overview"]),
    Rule::Field(Field::Website, &["website", "website url", "url"]),
    Rule::Field(Field::LinkedIn, &["linkedin", "linkedin url"]),
    Rule::Field(Field::Founded, &["founded", "founded year", "year founded"]),
    Rule::Field(
        Field::Employees,
        &["employees", "employee count", "team size", "headcount"],
    ),
    Rule::Field(
        Field::Funding,
        &["funding", "funding raised", "total funding"],
    ),
    Rule::Field(Field::Revenue, &["revenue", "annual revenue"]),
    Rule::Field(
        Field::Features,
        &["features", "main features", "key features"],
    ),
    Rule::Field(
        Field::Similarity,
        &["similarity", "similarity score", "confidence"],
    ),
    Rule::LetteredHeader,
    Rule::CategoryHeader,
];

/// Meaning of one input line.
#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Starts a record. A provisional name may be replaced by a following
    /// labeled header (`COMPETITOR A - Market Leader` then `Company: X`).
    Header { name: String, provisional: bool },
    Field(Field, String),
}

/// Extracts competitor records from free text. Never fails.
#[must_use]
pub fn parse_heuristic(text: &str) -> Vec<CompetitorProfile> {
    let mut records = Vec::new();
    let mut current: Option<(CompetitorProfile, bool)> = None;

    for raw in text.lines() {
        let line = strip_markers(raw);
        if line.is_empty() {
            continue;
        }

        match classify(line) {
            Some(Line::Header { name, provisional }) => match current.as_mut() {
                Some((record, open)) if *open && !provisional => {
                    record.name = name;
                    *open = false;
                }
                _ => {
                    if let Some((record, _)) = current.take() {
                        records.push(record);
                    }
                    current = Some((CompetitorProfile::named(name), provisional));
                }
            },
            Some(Line::Field(field, value)) => {
                if let Some((record, _)) = current.as_mut() {
                    apply_field(record, field, &value);
                }
            }
            None => {}
        }
    }

    if let Some((record, _)) = current {
        records.push(record);
    }

    // A lettered header that never got a company line has no real name.
    records.retain(|r| !is_category_label(&r.name));
    dedupe_by_name(records)
}

fn classify(line: &str) -> Option<Line> {
    GRAMMAR.iter().find_map(|rule| match_rule(*rule, line))
}

fn match_rule(rule: Rule, line: &str) -> Option<Line> {
    match rule {
        Rule::LabeledHeader(labels) => {
            let value = labeled_value(line, labels)?;
            header(value, false)
        }
        Rule::Field(field, labels) => {
            labeled_value(line, labels).map(|v| Line::Field(field, v.to_string()))
        }
        Rule::LetteredHeader => {
            let caps = LETTERED_HEADER_RE.as_ref()?.captures(line)?;
            let name = caps.get(1)?.as_str();
            let provisional = is_category_label(name);
            header(name, provisional)
        }
        Rule::CategoryHeader => {
            let caps = CATEGORY_HEADER_RE.as_ref()?.captures(line)?;
            header(caps.get(1)?.as_str(), true)
        }
    }
}

fn header(raw: &str, provisional: bool) -> Option<Line> {
    let name = clean_name(raw);
    (name.chars().count() >= MIN_NAME_CHARS).then_some(Line::Header { name, provisional })
}

/// Returns the value after `label:` when the line's label is one of `labels`.
fn labeled_value<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    let (label, value) = line.split_once(':')?;
    let label = label
        .trim()
        .trim_matches(|c| matches!(c, '*' | '_'))
        .trim()
        .to_lowercase();
    labels
        .contains(&label.as_str())
        .then(|| value.trim().trim_start_matches(['*', '_']).trim())
}

fn is_category_label(name: &str) -> bool {
    let lower = clean_name(name).to_lowercase();
    CATEGORY_LABELS.contains(&lower.as_str())
}

fn apply_field(record: &mut CompetitorProfile, field: Field, value: &str) {
    match field {
        Field::Description => record.description = clean_text(value),
        Field::Website => record.website_url = normalize_url(value),
        Field::LinkedIn => record.linkedin_url = normalize_url(value),
        Field::Founded => record.founded_year = parse_number(value).and_then(to_integer),
        Field::Employees => record.employee_count = parse_number(value).and_then(to_integer),
        Field::Funding => record.funding_raised = parse_number(value),
        Field::Revenue => record.revenue = parse_number(value),
        Field::Features => record.main_features = clean_text(value),
        Field::Similarity => record.similarity_score = clamp_similarity_text(value),
    }
}

/// Strips list bullets, numbering and heading marks from the front of a line.
fn strip_markers(raw: &str) -> &str {
    let mut line = raw.trim();
    loop {
        let before = line;
        line = line
            .trim_start_matches(['-', '*', '•', '#', '>'])
            .trim_start();
        let digits = line.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 && digits < 4 {
            let rest = &line[digits..];
            if let Some(stripped) = rest.strip_prefix(['.', ')']) {
                line = stripped.trim_start();
            }
        }
        if line == before {
            return line;
        }
    }
}
