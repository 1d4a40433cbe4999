//! Named-section extraction from report prose.
//!
//! Reports are loosely structured markdown. A section starts at a line
//! labeled `Name:` (optionally bulleted, bold or `#`-prefixed) and runs
//! until the next heading-like line.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::normalize::parse_number;

/// Confidence reported when a memo states none.
pub const DEFAULT_MEMO_CONFIDENCE: u8 = 50;

const DEFAULT_METHODOLOGY: &str = "Comparable company analysis";

/// Longest line still treated as a bare heading.
const MAX_HEADING_CHARS: usize = 60;

/// Labels that end the previous section even when followed by inline text.
const KNOWN_LABELS: &[&str] = &[
    "analysis",
    "recommendations",
    "market positioning",
    "executive summary",
    "investment thesis",
    "pros",
    "cons",
    "risks",
    "opportunities",
    "valuation",
    "range",
    "methodology",
    "recommendation",
    "investment recommendation",
    "confidence",
];

static VALUATION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)valuation[^:\n$0-9]*:?\s*(\$?\s*[0-9][0-9,.]*\s*(?:million|billion|mn|bn|m|b)?)")
        .ok()
});

static RANGE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)range:?\s*\$?\s*([0-9][0-9,.]*)\s*(million|billion|mn|bn|m|b)?\s*(?:-|–|—|to)\s*\$?\s*([0-9][0-9,.]*)\s*(million|billion|mn|bn|m|b)?",
    )
    .ok()
});

static CONFIDENCE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)confidence[^0-9\n]{0,20}([0-9]{1,3})\s*%?").ok());

/// Returns the body of the section labeled `name`, if present.
#[must_use]
pub fn section(text: &str, name: &str) -> Option<String> {
    let wanted = name.to_lowercase();
    let mut lines = text.lines();
    let mut body = Vec::new();

    // Find the heading; it may carry inline content after the colon.
    loop {
        let line = lines.next()?;
        if let Some(inline) = heading_match(line, &wanted) {
            if !inline.is_empty() {
                body.push(inline.to_string());
            }
            break;
        }
    }

    for line in lines {
        if is_heading(line) {
            break;
        }
        body.push(line.to_string());
    }

    let joined = body.join("\n").trim().to_string();
    Some(joined)
}

/// Splits a section body into list items, dropping bullets and numbering.
///
/// When the body has bullet lines only those are kept; otherwise every
/// non-blank line is an item.
#[must_use]
pub fn list_items(body: &str) -> Vec<String> {
    let bulleted: Vec<_> = body
        .lines()
        .filter_map(|l| strip_bullet(l.trim()))
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect();
    if !bulleted.is_empty() {
        return bulleted;
    }
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Recommendation bullets from a competitor report.
#[must_use]
pub fn extract_recommendations(text: &str) -> Vec<String> {
    section(text, "Recommendations")
        .map(|body| list_items(&body))
        .unwrap_or_default()
}

/// Market positioning prose from a competitor report.
#[must_use]
pub fn extract_market_positioning(text: &str) -> String {
    section(text, "Market Positioning").unwrap_or_default()
}

/// Final call of an investment memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    /// Proceed with the investment.
    Invest,
    /// Decline.
    Pass,
    /// Undecided pending diligence.
    MoreInfo,
}

impl Recommendation {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invest => "invest",
            Self::Pass => "pass",
            Self::MoreInfo => "more-info",
        }
    }
}

/// Valuation block of a memo, in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// Recommended pre-money valuation (0 when not stated).
    pub recommended: f64,
    /// Lower bound of the range (0 when not stated).
    pub range_min: f64,
    /// Upper bound of the range (0 when not stated).
    pub range_max: f64,
    /// Valuation methodology.
    pub methodology: String,
}

/// Structured view of a memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoAnalysis {
    /// Executive summary paragraph.
    pub executive_summary: String,
    /// Investment thesis pros.
    pub pros: Vec<String>,
    /// Investment thesis cons.
    pub cons: Vec<String>,
    /// Key risks.
    pub risks: Vec<String>,
    /// Upside opportunities.
    pub opportunities: Vec<String>,
    /// Valuation block.
    pub valuation: Valuation,
    /// Final call.
    pub recommendation: Recommendation,
    /// Confidence in the call, 0 to 100.
    pub confidence: u8,
}

/// Parses memo prose into its sections. Never fails.
#[must_use]
pub fn parse_memo(text: &str) -> MemoAnalysis {
    let list = |name: &str| {
        section(text, name)
            .map(|body| list_items(&body))
            .unwrap_or_default()
    };

    MemoAnalysis {
        executive_summary: section(text, "Executive Summary").unwrap_or_default(),
        pros: list("Pros"),
        cons: list("Cons"),
        risks: list("Risks"),
        opportunities: list("Opportunities"),
        valuation: parse_valuation(text),
        recommendation: parse_recommendation(text),
        confidence: parse_confidence(text),
    }
}

fn parse_valuation(text: &str) -> Valuation {
    let recommended = VALUATION_RE
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| parse_number(m.as_str()))
        .unwrap_or(0.0);

    let (range_min, range_max) = RANGE_RE
        .as_ref()
        .and_then(|re| re.captures(text))
        .map_or((0.0, 0.0), |c| {
            // A shared unit ("$10-20 million") applies to both bounds.
            let unit = c.get(4).or_else(|| c.get(2)).map_or("", |m| m.as_str());
            let lo_unit = c.get(2).map_or(unit, |m| m.as_str());
            let bound = |idx: usize, unit: &str| {
                c.get(idx)
                    .and_then(|m| parse_number(&format!("{} {unit}", m.as_str())))
                    .unwrap_or(0.0)
            };
            (bound(1, lo_unit), bound(3, unit))
        });

    let methodology = section(text, "Methodology")
        .and_then(|body| body.lines().next().map(|l| l.trim().to_string()))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_METHODOLOGY.to_string());

    Valuation {
        recommended,
        range_min,
        range_max,
        methodology,
    }
}

fn parse_recommendation(text: &str) -> Recommendation {
    let line = section(text, "Recommendation")
        .or_else(|| section(text, "Investment Recommendation"))
        .unwrap_or_default()
        .to_lowercase();

    if line.contains("more info") || line.contains("more-info") || line.contains("more information")
    {
        Recommendation::MoreInfo
    } else if line.contains("pass")
        || line.contains("do not invest")
        || line.contains("not recommend")
    {
        Recommendation::Pass
    } else if line.contains("invest") {
        Recommendation::Invest
    } else {
        Recommendation::MoreInfo
    }
}

fn parse_confidence(text: &str) -> u8 {
    CONFIDENCE_RE
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .map_or(DEFAULT_MEMO_CONFIDENCE, |v| {
            u8::try_from(v.min(100)).unwrap_or(DEFAULT_MEMO_CONFIDENCE)
        })
}

/// If `line` is the heading `wanted`, returns any inline content after it.
fn heading_match<'a>(line: &'a str, wanted: &str) -> Option<&'a str> {
    let stripped = strip_heading_marks(line);
    let (label, rest) = match stripped.split_once(':') {
        Some((label, rest)) => (label, rest),
        None => (stripped, ""),
    };
    let label = label.trim().trim_matches(|c| matches!(c, '*' | '_')).trim();
    if !label.eq_ignore_ascii_case(wanted) {
        return None;
    }
    // A bare label without a colon only counts when it is a markdown heading.
    if !stripped.contains(':') && !line.trim_start().starts_with('#') {
        return None;
    }
    Some(rest.trim().trim_matches(|c| matches!(c, '*' | '_')).trim())
}

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
        return true;
    }
    if strip_bullet(trimmed).is_some() {
        return false;
    }
    let stripped = strip_heading_marks(trimmed);
    let bare = stripped.trim_end_matches(['*', '_']).trim_end();
    if bare.ends_with(':') && bare.chars().count() <= MAX_HEADING_CHARS {
        return true;
    }
    stripped.split_once(':').is_some_and(|(label, _)| {
        let label = label.trim().trim_matches(|c| matches!(c, '*' | '_')).trim();
        KNOWN_LABELS.contains(&label.to_lowercase().as_str())
    })
}

fn strip_heading_marks(line: &str) -> &str {
    let trimmed = line.trim().trim_start_matches('#').trim_start();
    let trimmed = trimmed.trim_start_matches(['*', '_']).trim_start();
    trim_numbering(trimmed)
}

fn trim_numbering(line: &str) -> &str {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ['-', '•', '*'] {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.starts_with(' ') || rest.is_empty() {
                return Some(rest.trim());
            }
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return Some(rest.trim());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPETITOR_REPORT: &str = "\
Analysis:
Crowded market.

Recommendations:
- Focus on SMB segment
- Build integrations
3. Raise prices

Market Positioning:
Acme sits between incumbents and point tools.
";

    #[test]
    fn test_recommendations() {
        assert_eq!(
            extract_recommendations(COMPETITOR_REPORT),
            vec!["Focus on SMB segment", "Build integrations", "Raise prices"]
        );
    }

    #[test]
    fn test_market_positioning() {
        assert_eq!(
            extract_market_positioning(COMPETITOR_REPORT),
            "Acme sits between incumbents and point tools."
        );
    }

    #[test]
    fn test_missing_sections() {
        assert!(extract_recommendations("nothing here").is_empty());
        assert_eq!(extract_market_positioning("nothing here"), "");
    }

    #[test]
    fn test_markdown_heading_sections() {
        let text = "## Recommendations\n- One\n- Two\n## Next\n- Three";
        assert_eq!(extract_recommendations(text), vec!["One", "Two"]);
    }

    const MEMO: &str = "\
Executive Summary: Acme builds payments rails for SMBs.

Pros:
- Strong team
- Fast growth

Cons:
- Thin margins

Risks:
- Regulation

Opportunities:
- Europe expansion

Valuation: $25 million
Range: $20-30 million
Methodology: Revenue multiple

Recommendation: Invest
Confidence: 72%
";

    #[test]
    fn test_parse_memo() {
        let memo = parse_memo(MEMO);
        assert_eq!(
            memo.executive_summary,
            "Acme builds payments rails for SMBs."
        );
        assert_eq!(memo.pros, vec!["Strong team", "Fast growth"]);
        assert_eq!(memo.cons, vec!["Thin margins"]);
        assert_eq!(memo.risks, vec!["Regulation"]);
        assert_eq!(memo.opportunities, vec!["Europe expansion"]);
        assert!((memo.valuation.recommended - 25_000_000.0).abs() < 1.0);
        assert!((memo.valuation.range_min - 20_000_000.0).abs() < 1.0);
        assert!((memo.valuation.range_max - 30_000_000.0).abs() < 1.0);
        assert_eq!(memo.valuation.methodology, "Revenue multiple");
        assert_eq!(memo.recommendation, Recommendation::Invest);
        assert_eq!(memo.confidence, 72);
    }

    #[test]
    fn test_memo_defaults() {
        let memo = parse_memo("Just prose.");
        assert_eq!(memo.confidence, DEFAULT_MEMO_CONFIDENCE);
        assert_eq!(memo.recommendation, Recommendation::MoreInfo);
        assert_eq!(memo.valuation.methodology, "Comparable company analysis");
        assert!(memo.pros.is_empty());
    }

    #[test]
    fn test_recommendation_pass() {
        let memo = parse_memo("Recommendation: Pass for now, do not invest.");
        assert_eq!(memo.recommendation, Recommendation::Pass);
    }

    #[test]
    fn test_recommendation_serialization() {
        let json = serde_json::to_string(&Recommendation::MoreInfo).unwrap_or_default();
        assert_eq!(json, "\"more-info\"");
    }
}
