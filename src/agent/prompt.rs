//! System prompts, user templates and the template renderer.
//!
//! User templates use `{placeholder}` slots filled by [`render`]. System
//! prompts can be overridden per file from a prompt directory.

use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::{DocumentSummary, MemoContext, PriorRecord, ReportAction, ReportKind, ReportRequest};

/// System prompt for the competitor flow.
pub const COMPETITORS_SYSTEM_PROMPT: &str = r"You are a competitive intelligence analyst who studies startup ecosystems. You identify direct and indirect competitors of a startup and describe each of them with hard data.

You can call `web_search` to look up current company information and `save_competitor` to record each competitor you identify. Use search to:

- find companies that sell a similar product to a similar customer
- confirm founding year, headcount, funding and revenue figures
- compare positioning, pricing and feature sets

Prefer quantitative facts over adjectives and name your sources when you can. Every report ends with a `Market Positioning:` section and a `Recommendations:` section written as a bulleted list.";

/// System prompt for the market flow.
pub const MARKET_SYSTEM_PROMPT: &str = r"You are a market research analyst covering early-stage companies. You size markets, describe customer segments and identify the trends, risks and entry strategies that matter to an investor.

You can call `web_search` to gather current market data, industry reports, regulation and funding activity. Favor recent, verifiable numbers, state the year of every figure and cite sources when possible. Close every report with a `Recommendations:` section written as a bulleted list.";

/// System prompt for the memo flow.
pub const MEMO_SYSTEM_PROMPT: &str = r"You are an investment analyst at a venture capital fund. You write investment memos that a partner can read in ten minutes and act on.

A memo weighs the team, the market, the product, the traction and the competition, then lands on a clear call. Be direct about weaknesses. Never invent metrics that were not provided; say when data is missing.

Always use these headings, each followed by a colon:
Executive Summary, Pros, Cons, Risks, Opportunities, Valuation, Range, Methodology, Recommendation, Confidence.

Pros, Cons, Risks and Opportunities are bulleted lists. Valuation is a single USD amount, Range is `$X - $Y`, Recommendation is one of Invest, Pass or More Info, and Confidence is a percentage.";

/// System prompt for competitor extraction.
pub const PROCESSOR_SYSTEM_PROMPT: &str = r"You turn competitor research reports into clean structured records for a database. You only report competitors that the report actually names, you never invent figures, and you leave a field out when the report does not state it.";

/// System prompt for document processing.
pub const DOCUMENT_SYSTEM_PROMPT: &str = r"You review startup documents (pitch decks, financial statements, market studies) for a venture capital analyst. You are concise, factual and you flag anything an investor should question.";

/// System prompt for startup analysis, summaries and analyst chat.
pub const ADVISOR_SYSTEM_PROMPT: &str = r"You are an investment analyst at a venture capital fund who knows this startup's file: its profile, metrics and reviewed documents. You write structured, specific answers, separate facts on file from your own judgement and say plainly when information is missing.";

/// Competitor research template.
pub const COMPETITORS_RESEARCH_TEMPLATE: &str = r"Research the competitive landscape of this startup.

STARTUP
- Name: {startupName}
- Sector: {startupSector}
- Description: {startupDescription}

KNOWN COMPETITORS
{competitorsList}

Cover direct competitors, indirect competitors and credible new entrants. For each competitor write a block in exactly this form:

Competitor: <company name>
Description: <what they do and for whom>
Founded: <year>
Employees: <headcount>
Funding: <total raised in USD>
Revenue: <annual revenue in USD, if known>
Website: <url>
LinkedIn: <url>
Features: <key features, comma separated>
Similarity: <0 to 1, how close they are to the startup>

Then add:

Market Positioning: <where the startup sits relative to these competitors>

Recommendations:
- <actionable recommendation>";

/// Competitor analysis template.
pub const COMPETITORS_ANALYZE_TEMPLATE: &str = r"Analyze the competition of this startup in depth.

STARTUP: {startupName}
SECTOR: {startupSector}

EXISTING COMPETITORS
{competitorsList}

Cover:
1. Positioning map and where each competitor sits on it
2. Strengths and weaknesses of each competitor
3. Gaps in the market the startup can own
4. Pricing and business model differences
5. Overlap in customer segments
6. Go-to-market differences
7. Threat level of each competitor

Search for any important competitor missing from the list. Finish with `Market Positioning:` and `Recommendations:` sections.";

/// Competitor comparison template.
pub const COMPETITORS_COMPARE_TEMPLATE: &str = r"Compare this startup against its competitors.

STARTUP: {startupName}
DESCRIPTION: {startupDescription}

COMPETITORS
{competitorsList}

Compare them on product features, positioning, technology, business model, customer segments, pricing, team and funding. Present the comparison as a matrix followed by strategic insights, then finish with `Market Positioning:` and `Recommendations:` sections.";

/// Market research template, shared by research, analyze and forecast.
pub const MARKET_RESEARCH_TEMPLATE: &str = r"Write a market research report for this startup.

STARTUP
- Name: {startupName}
- Sector: {startupSector}
- Description: {startupDescription}

Cover:
1. MARKET OVERVIEW: total addressable market, growth rate, maturity and forecasts for the next 3 to 5 years
2. TARGET MARKET: customer segments, buying behavior, geographic opportunities and pain points
3. COMPETITIVE LANDSCAPE: leaders, challengers, concentration and barriers to entry
4. TRENDS AND OPPORTUNITIES: technology adoption, regulation and emerging niches
5. ENTRY STRATEGY: pricing, distribution channels and partnerships
6. RISKS: market, regulatory and competitive risks with mitigations
7. FINANCIAL OUTLOOK: revenue potential, funding activity and comparable companies

Use specific figures and cite sources where possible.";

/// Memo generation template.
pub const MEMO_GENERATE_TEMPLATE: &str = r"Write an investment memo for this startup.

STARTUP
- Name: {startupName}
- Sector: {startupSector}
- Description: {startupDescription}
- Team: {teamInfo}

METRICS
{metrics}

COMPETITORS
{competitors}

MARKET ANALYSIS
{marketAnalysis}

DOCUMENTS
{documents}";

/// Memo update template.
pub const MEMO_UPDATE_TEMPLATE: &str = r"Update this investment memo with the new information below. Keep what is still accurate, revise what changed and say what changed in the Executive Summary.

EXISTING MEMO
{existingMemo}

NEW INFORMATION
- Startup: {startupName}
- Sector: {startupSector}

METRICS
{metrics}

COMPETITORS
{competitors}

MARKET ANALYSIS
{marketAnalysis}

DOCUMENTS
{documents}";

/// Memo enhancement template.
pub const MEMO_ENHANCE_TEMPLATE: &str = r"Deepen the analysis of this investment memo. Sharpen the thesis, quantify risks where possible, stress-test the valuation and make the recommendation explicit.

EXISTING MEMO
{existingMemo}";

/// Competitor extraction template.
pub const PROCESSOR_TEMPLATE: &str = r#"Extract every competitor named in this research report.

RESEARCH REPORT
{researchReport}

Return a JSON object of the form {"competitors": [...]} where each element has these fields:
competitor_name, description, founded_year (number), employee_count (number), funding_raised (number, USD), revenue (number, USD), website_url, linkedin_url, main_features, similarity_score (0 to 1).

Leave out fields the report does not state. Only include competitors with at least a name and a description."#;

/// Document summary template.
pub const DOCUMENT_SUMMARY_TEMPLATE: &str = r"Summarize the document '{documentName}' ({documentType}) in at most five sentences for an investor.

{content}";

/// Document KPI template.
pub const DOCUMENT_KPIS_TEMPLATE: &str = r"List the key performance indicators stated in the document '{documentName}', one per line as `KPI: value`. Say 'None stated' if there are none.

{content}";

/// Document red-flag template.
pub const DOCUMENT_RED_FLAGS_TEMPLATE: &str = r"List the red flags an investor should question in the document '{documentName}', one per line. Say 'None identified' if there are none.

{content}";

/// Whole-startup investment analysis template.
pub const ANALYSIS_TEMPLATE: &str = r"Analyze this startup as an investment opportunity.

{startupContext}

Structure the analysis with these headings, each followed by a colon:

Executive Summary: two or three paragraphs on the opportunity
Pros: three to five strengths (metrics, team, product, market) as a bulleted list
Cons: three to five weaknesses, risks or red flags as a bulleted list
Open Questions: five to eight due diligence questions as a bulleted list
Recommendation: Invest, Pass or More Info, with the reasoning
Scores: 1 to 10 for Team, Product, Market, Financials and Risk";

/// Executive summary template.
pub const SUMMARY_TEMPLATE: &str = r"Write a structured executive summary of this startup for an investor.

{startupContext}

Use these headings, each followed by a colon: Problem, Solution, Product, AI Technology, Team, Metrics, Funding Round, Investment Thesis. Under Investment Thesis give the reasons to invest, the risks and the open questions. Keep each section short and specific, and use only the information on file.";

/// Analyst chat template.
pub const CHAT_TEMPLATE: &str = r"{startupContext}

CONVERSATION SO FAR
{conversation}

USER: {message}

Help the user analyze this startup: investment pros and cons, memo updates, market and competitor research, due diligence questions and follow-ups. Answer clearly and with structure. If asked to update the investment memo, give the complete updated text.";

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/dealroom/prompts";

const COMPETITORS_FILENAME: &str = "competitors.md";
const MARKET_FILENAME: &str = "market.md";
const MEMO_FILENAME: &str = "memo.md";
const PROCESSOR_FILENAME: &str = "processor.md";
const DOCUMENT_FILENAME: &str = "documents.md";
const ADVISOR_FILENAME: &str = "advisor.md";

static PLACEHOLDER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// Fills `{name}` placeholders from `vars` in one left-to-right pass.
///
/// Unknown placeholders stay verbatim and substituted values are never
/// scanned again, so a value containing `{x}` is inserted literally.
#[must_use]
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let Some(re) = PLACEHOLDER_RE.as_ref() else {
        return template.to_string();
    };
    re.replace_all(template, |caps: &Captures<'_>| {
        let name = caps.get(1).map_or("", |m| m.as_str());
        vars.iter()
            .find(|(key, _)| *key == name)
            .map_or_else(|| caps[0].to_string(), |(_, value)| (*value).to_string())
    })
    .into_owned()
}

/// System prompts for every flow.
///
/// Loaded from files when available, falling back to compiled-in defaults.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Competitor flow.
    pub competitors: String,
    /// Market flow.
    pub market: String,
    /// Memo flow.
    pub memo: String,
    /// Competitor extraction.
    pub processor: String,
    /// Document processing.
    pub documents: String,
    /// Startup analysis, summaries and chat.
    pub advisor: String,
}

impl PromptSet {
    /// Loads prompts, falling back to compiled-in defaults per file.
    ///
    /// Resolution order for the directory:
    /// 1. `prompt_dir` (from `--prompt-dir` or config)
    /// 2. `DEALROOM_PROMPT_DIR`
    /// 3. `~/.config/dealroom/prompts/`
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("DEALROOM_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            competitors: load_file(COMPETITORS_FILENAME, COMPETITORS_SYSTEM_PROMPT),
            market: load_file(MARKET_FILENAME, MARKET_SYSTEM_PROMPT),
            memo: load_file(MEMO_FILENAME, MEMO_SYSTEM_PROMPT),
            processor: load_file(PROCESSOR_FILENAME, PROCESSOR_SYSTEM_PROMPT),
            documents: load_file(DOCUMENT_FILENAME, DOCUMENT_SYSTEM_PROMPT),
            advisor: load_file(ADVISOR_FILENAME, ADVISOR_SYSTEM_PROMPT),
        }
    }

    /// Compiled-in defaults without touching the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            competitors: COMPETITORS_SYSTEM_PROMPT.to_string(),
            market: MARKET_SYSTEM_PROMPT.to_string(),
            memo: MEMO_SYSTEM_PROMPT.to_string(),
            processor: PROCESSOR_SYSTEM_PROMPT.to_string(),
            documents: DOCUMENT_SYSTEM_PROMPT.to_string(),
            advisor: ADVISOR_SYSTEM_PROMPT.to_string(),
        }
    }

    /// System prompt for a report flow.
    #[must_use]
    pub fn system_for(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Competitors => &self.competitors,
            ReportKind::Market => &self.market,
            ReportKind::Memo => &self.memo,
        }
    }

    /// Writes the default prompts into `dir`, leaving existing files alone.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (COMPETITORS_FILENAME, COMPETITORS_SYSTEM_PROMPT),
            (MARKET_FILENAME, MARKET_SYSTEM_PROMPT),
            (MEMO_FILENAME, MEMO_SYSTEM_PROMPT),
            (PROCESSOR_FILENAME, PROCESSOR_SYSTEM_PROMPT),
            (DOCUMENT_FILENAME, DOCUMENT_SYSTEM_PROMPT),
            (ADVISOR_FILENAME, ADVISOR_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }
        Ok(written)
    }

    /// `~/.config/dealroom/prompts`, if a home directory exists.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// User template for a flow and action.
#[must_use]
pub const fn template_for(kind: ReportKind, action: ReportAction) -> &'static str {
    match (kind, action) {
        (ReportKind::Competitors, ReportAction::Analyze) => COMPETITORS_ANALYZE_TEMPLATE,
        (ReportKind::Competitors, ReportAction::Compare) => COMPETITORS_COMPARE_TEMPLATE,
        (ReportKind::Competitors, _) => COMPETITORS_RESEARCH_TEMPLATE,
        (ReportKind::Market, _) => MARKET_RESEARCH_TEMPLATE,
        (ReportKind::Memo, ReportAction::Update) => MEMO_UPDATE_TEMPLATE,
        (ReportKind::Memo, ReportAction::Enhance) => MEMO_ENHANCE_TEMPLATE,
        (ReportKind::Memo, _) => MEMO_GENERATE_TEMPLATE,
    }
}

/// `- name: description` lines, or a placeholder when empty.
#[must_use]
pub fn competitors_list(prior: &[PriorRecord]) -> String {
    if prior.is_empty() {
        return "No competitors found".to_string();
    }
    let mut out = String::new();
    for (i, record) in prior.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "- {}", record.name);
        if !record.description.trim().is_empty() {
            let _ = write!(out, ": {}", record.description.trim());
        }
    }
    out
}

pub(crate) fn documents_block(documents: &[DocumentSummary]) -> String {
    if documents.is_empty() {
        return "No documents available".to_string();
    }
    documents
        .iter()
        .map(|d| {
            let doc_type = if d.doc_type.is_empty() { "document" } else { &d.doc_type };
            format!(
                "- {} ({doc_type})\n  Summary: {}\n  KPIs: {}\n  Red flags: {}",
                d.name,
                or_none(&d.summary),
                or_none(&d.kpis),
                or_none(&d.red_flags)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_none(s: &str) -> &str {
    if s.trim().is_empty() { "n/a" } else { s.trim() }
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}

/// Renders the user prompt for a report request.
#[must_use]
pub fn build_report_prompt(request: &ReportRequest) -> String {
    let memo = request.memo.clone().unwrap_or_default();
    let description = or_default(Some(&request.subject_description), "No description provided");
    let competitors = competitors_list(&request.prior_context);
    let metrics = memo
        .metrics
        .as_ref()
        .map_or_else(|| "No metrics available".to_string(), |m| m.to_prompt_block());
    let documents = documents_block(&memo.documents);
    let MemoContext {
        team_info,
        market_report,
        existing_memo,
        ..
    } = &memo;

    let team = or_default(team_info.as_deref(), "No team information available");
    let market = or_default(market_report.as_deref(), "No market analysis available");
    let existing = or_default(existing_memo.as_deref(), "No existing memo");

    let vars: [(&str, &str); 10] = [
        ("startupName", &request.subject_name),
        ("startupSector", request.category_or_default()),
        ("startupDescription", description),
        ("competitorsList", &competitors),
        ("competitors", &competitors),
        ("teamInfo", team),
        ("metrics", &metrics),
        ("marketAnalysis", market),
        ("documents", &documents),
        ("existingMemo", existing),
    ];

    render(template_for(request.kind, request.action), &vars)
}
