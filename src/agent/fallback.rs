//! Deterministic reports served when the model fails or is disabled.
//!
//! Built only from the [`ReportRequest`], so the same request always yields
//! the same text. The competitor fallback lists competitors in the
//! `Competitor:` / `Description:` form the heuristic extractor reads.

use std::fmt::Write;

use crate::core::{ReportKind, ReportRequest};

/// Closing line of every fallback report.
pub const FALLBACK_NOTE: &str = "Note: This report was generated from the information on file without model output. It is lower-confidence boilerplate and should be regenerated once the model is available.";

/// Builds the fallback report for `request`.
#[must_use]
pub fn fallback_report(request: &ReportRequest) -> String {
    let body = match request.kind {
        ReportKind::Competitors => competitors_fallback(request),
        ReportKind::Market => market_fallback(request),
        ReportKind::Memo => memo_fallback(request),
    };
    format!("{body}\n\n{FALLBACK_NOTE}")
}

fn description(request: &ReportRequest) -> &str {
    let d = request.subject_description.trim();
    if d.is_empty() { "No description provided" } else { d }
}

fn header(out: &mut String, title: &str, request: &ReportRequest) {
    let _ = writeln!(out, "{title} for {}", request.subject_name);
    let _ = writeln!(out);
    let _ = writeln!(out, "SECTOR: {}", request.category_or_default());
    let _ = writeln!(out, "DESCRIPTION: {}", description(request));
}

fn competitors_fallback(request: &ReportRequest) -> String {
    let name = &request.subject_name;
    let category = request.category_or_default();
    let mut out = String::new();
    header(&mut out, "Competitive Analysis Report", request);

    let _ = write!(
        out,
        "\nCOMPETITIVE LANDSCAPE\n\
         {category} attracts both established incumbents and venture-backed challengers. \
         Differentiation usually comes from product depth, distribution and pricing rather \
         than from technology alone.\n\nKEY COMPETITORS\n"
    );

    if request.prior_context.is_empty() {
        let generic = [
            (
                format!("Established {category} incumbents"),
                format!("Large, well-funded companies with an installed customer base in {category}."),
            ),
            (
                format!("Venture-backed {category} challengers"),
                "Recently funded startups competing on product experience and price.".to_string(),
            ),
            (
                "Adjacent platform providers".to_string(),
                format!("Companies in neighboring markets that could extend into {category}."),
            ),
        ];
        for (competitor, what) in &generic {
            let _ = write!(out, "\nCompetitor: {competitor}\nDescription: {what}\n");
        }
    } else {
        for record in &request.prior_context {
            let what = if record.description.trim().is_empty() {
                "Known competitor on file."
            } else {
                record.description.trim()
            };
            let _ = write!(out, "\nCompetitor: {}\nDescription: {what}\n", record.name);
        }
    }

    let _ = write!(
        out,
        "\nMarket Positioning: {name} competes in {category}. Its position relative to the \
         competitors above has not been verified with current data.\n\n\
         Recommendations:\n\
         - Validate the competitor list with fresh market research\n\
         - Compare pricing and packaging against the closest competitors\n\
         - Identify the customer segment {name} serves best and focus positioning there\n\
         - Track competitor funding and product announcements"
    );
    out
}

fn market_fallback(request: &ReportRequest) -> String {
    let name = &request.subject_name;
    let category = request.category_or_default();
    let mut out = String::new();
    header(&mut out, "Market Research Report", request);

    let _ = write!(
        out,
        "\nMARKET OVERVIEW\n\
         The {category} market is evaluated here without current market data. Size, growth \
         rate and maturity need to be confirmed from recent industry reports.\n\n\
         TARGET MARKET\n\
         Likely customers are organizations and individuals that face the problem {name} \
         addresses. Segments, buying behavior and geography need validation.\n\n\
         COMPETITIVE LANDSCAPE\n\
         Expect established {category} incumbents alongside venture-backed challengers.\n\n\
         TRENDS AND OPPORTUNITIES\n\
         Digital adoption and regulatory change are the usual drivers in {category}.\n\n\
         RISKS\n\
         - Market size may be smaller than assumed\n\
         - Regulatory requirements may slow entry\n\
         - Incumbents may respond on price\n\n\
         Recommendations:\n\
         - Size the addressable market from primary sources\n\
         - Interview target customers to confirm the pain point\n\
         - Define a focused entry segment and channel\n\
         - Regenerate this report with live research"
    );
    out
}

fn memo_fallback(request: &ReportRequest) -> String {
    let name = &request.subject_name;
    let category = request.category_or_default();
    let memo = request.memo.clone().unwrap_or_default();
    let mut out = String::new();
    header(&mut out, "Investment Memo", request);

    let metrics = memo
        .metrics
        .as_ref()
        .map_or_else(|| "No metrics available".to_string(), |m| m.to_prompt_block());

    let _ = write!(
        out,
        "\nExecutive Summary: {name} is a {category} company. {} The data on file is not \
         sufficient for an investment decision without further diligence.\n\n\
         Metrics:\n{metrics}\n\n\
         Pros:\n\
         - Operates in the {category} market\n\
         - Company information is on file for follow-up\n\n\
         Cons:\n\
         - Analysis has not been performed on current data\n\n\
         Risks:\n\
         - Market, execution and competitive risks are unassessed\n\n\
         Opportunities:\n\
         - To be determined after diligence\n\n\
         Valuation: not determined\n\
         Methodology: Comparable company analysis\n\
         Recommendation: More Info\n\
         Confidence: 20%",
        description(request)
    );
    out
}
