//! Report pipeline: request assembly, generation, extraction, persistence.
//!
//! Each call is independent. Context is read from the store under a short
//! lock before the model is called, and results are written back under a
//! second lock after it answers; no lock is held across an await.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::advisor::{AdvisorAgent, StartupContext};
use super::document::{DocumentAgent, DocumentInput};
use super::generator::ReportGenerator;
use super::processor::ProcessorAgent;
use crate::core::{
    AdvisorAnswer, AnalysisKind, ChatTurn, CompetitorProfile, DocumentSummary, GeneratedReport,
    MemoContext, PriorRecord, ReportAction, ReportKind, ReportOrigin, ReportRequest,
    StoredCompetitor,
};
use crate::error::{CommandError, Result, StorageError};
use crate::extract::{
    MemoAnalysis, extract, extract_market_positioning, extract_recommendations, parse_memo,
};
use crate::persist::{PersistOutcome, persist};
use crate::relay::StreamEvent;
use crate::storage::{SharedStorage, Storage, lock};

/// Buffered events between a streaming generation and its consumer.
const STREAM_BUFFER: usize = 64;

/// Newest documents sent with a chat message.
const CHAT_DOCUMENTS: usize = 5;

/// Who a report is about, as supplied by the caller.
///
/// Blank fields are filled from the stored startup row when one exists.
#[derive(Debug, Clone, Default)]
pub struct Subject {
    /// Startup id.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// One-paragraph description.
    pub description: Option<String>,
    /// Sector or category.
    pub category: Option<String>,
}

impl Subject {
    /// Subject known only by id.
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Everything a report flow produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    /// The generated report.
    pub report: GeneratedReport,
    /// History row id, when the report was saved.
    pub report_id: Option<i64>,
    /// Competitors found in the report text.
    pub competitors: Vec<CompetitorProfile>,
    /// `Recommendations:` bullets.
    pub recommendations: Vec<String>,
    /// `Market Positioning:` prose (competitor flow).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_positioning: Option<String>,
    /// Parsed memo (memo flow).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<MemoAnalysis>,
    /// Persistence counts (competitor research).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<PersistOutcome>,
}

/// Result of processing a research report into competitor rows.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    /// Extracted records.
    pub competitors: Vec<CompetitorProfile>,
    /// Number of records extracted.
    pub processed_count: usize,
    /// Rows inserted.
    pub inserted: usize,
    /// Rows updated.
    pub updated: usize,
    /// Extraction notes and per-record save failures.
    pub errors: Vec<String>,
}

/// Result of reviewing a document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    /// The review.
    #[serde(flatten)]
    pub document: DocumentSummary,
    /// Stored row id, when a startup was given.
    pub document_id: Option<i64>,
}

/// Result of a whole-startup analysis or summary.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// What was produced.
    pub kind: AnalysisKind,
    /// Analysed startup.
    pub startup_id: String,
    /// Its display name.
    pub startup_name: String,
    /// Analysis text.
    pub content: String,
    /// Whether the model or the fallback produced it.
    pub origin: ReportOrigin,
    /// Stored row id; fallback text is not stored.
    pub analysis_id: Option<i64>,
    /// Documents the analysis saw.
    pub documents_count: usize,
    /// Whether metrics were on file.
    pub has_metrics: bool,
}

/// Reply to an analyst chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    /// Reply text.
    pub response: String,
    /// The startup discussed.
    pub startup_name: String,
    /// Whether the model or the fallback produced it.
    pub origin: ReportOrigin,
}

/// The report pipeline over a provider and a store.
#[derive(Clone)]
pub struct ReportPipeline {
    generator: ReportGenerator,
    storage: SharedStorage,
}

impl ReportPipeline {
    /// Creates a pipeline. The generator gets the store for `save_competitor`.
    #[must_use]
    pub fn new(generator: ReportGenerator, storage: SharedStorage) -> Self {
        Self {
            generator: generator.with_storage(std::sync::Arc::clone(&storage)),
            storage,
        }
    }

    /// The report generator.
    pub const fn generator(&self) -> &ReportGenerator {
        &self.generator
    }

    /// The shared store.
    pub const fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Assembles a request from caller input and stored context.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] for a blank id and
    /// [`StorageError::NotFound`] when no name is given and the startup is
    /// not stored.
    pub fn prepare(
        &self,
        subject: &Subject,
        kind: ReportKind,
        action: ReportAction,
    ) -> Result<ReportRequest> {
        let id = subject.id.trim();
        if id.is_empty() {
            return Err(CommandError::InvalidArgument("subjectId is required".to_string()).into());
        }

        let store = lock(&self.storage)?;
        let startup = store.get_startup(id)?;

        let given = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let name = given(&subject.name)
            .or_else(|| startup.as_ref().map(|s| s.name.clone()))
            .ok_or_else(|| StorageError::NotFound {
                entity: "startup",
                id: id.to_string(),
            })?;
        let description = given(&subject.description)
            .or_else(|| startup.as_ref().and_then(|s| s.description.clone()))
            .unwrap_or_default();
        let category = given(&subject.category)
            .or_else(|| startup.as_ref().and_then(|s| s.sector.clone()))
            .unwrap_or_default();

        let mut request = ReportRequest::new(id, name, kind, action)
            .with_description(description)
            .with_category(category);

        let uses_prior = matches!(
            (kind, action),
            (ReportKind::Competitors, ReportAction::Analyze | ReportAction::Compare)
                | (ReportKind::Memo, _)
        );
        if uses_prior {
            request = request.with_prior_context(
                store
                    .list_competitors(id)?
                    .iter()
                    .map(prior_record)
                    .collect(),
            );
        }

        if kind == ReportKind::Memo {
            let latest_memo = store
                .latest_report(id, ReportKind::Memo)?
                .map(|r| r.report_text);
            let existing_memo = startup
                .as_ref()
                .and_then(|s| s.memo.clone())
                .or(latest_memo);
            request = request.with_memo_context(MemoContext {
                team_info: startup.as_ref().and_then(|s| s.team_info.clone()),
                metrics: store.get_metrics(id)?,
                market_report: store
                    .latest_report(id, ReportKind::Market)?
                    .map(|r| r.report_text),
                documents: store
                    .list_documents(id)?
                    .into_iter()
                    .map(|d| d.summary)
                    .collect(),
                existing_memo,
            });
        }

        debug!(
            subject_id = id,
            kind = %kind,
            action = %action,
            prior = request.prior_context.len(),
            "report request prepared"
        );
        Ok(request)
    }

    /// Generates a report with a blocking call and records the results.
    ///
    /// # Errors
    ///
    /// Returns storage errors from saving; generation itself never fails.
    pub async fn run(
        &self,
        request: &ReportRequest,
        cancel: &CancellationToken,
    ) -> Result<ReportOutcome> {
        let report = self.generator.generate(request, cancel).await;
        self.finish(request, report)
    }

    /// Starts a streaming generation and returns its event receiver.
    ///
    /// The report is recorded once the stream ends. Dropping the receiver
    /// cancels the generation.
    pub fn spawn_stream(
        &self,
        request: ReportRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let pipeline = self.clone();
        tokio::spawn(async move {
            let report = pipeline.generator.stream_into(&request, &tx, &cancel).await;
            drop(tx);
            if let Err(e) = pipeline.finish(&request, report) {
                warn!(subject_id = %request.subject_id, error = %e, "failed to record streamed report");
            }
        });
        rx
    }

    /// Extracts sections and records from a generated report and saves it.
    ///
    /// Competitor research from the model is persisted; records from a
    /// fallback report are returned but not written.
    ///
    /// # Errors
    ///
    /// Returns storage errors from saving the report.
    pub fn finish(&self, request: &ReportRequest, report: GeneratedReport) -> Result<ReportOutcome> {
        let text = report.report_text.as_str();
        let mut outcome = ReportOutcome {
            report_id: None,
            competitors: Vec::new(),
            recommendations: extract_recommendations(text),
            market_positioning: None,
            memo: None,
            persisted: None,
            report: report.clone(),
        };

        let mut store = lock(&self.storage)?;
        match request.kind {
            ReportKind::Competitors => {
                outcome.competitors = extract(text).records;
                outcome.market_positioning = Some(extract_market_positioning(text));
                if request.action == ReportAction::Research
                    && report.origin == ReportOrigin::Model
                {
                    outcome.persisted =
                        Some(persist(&mut *store, &request.subject_id, &outcome.competitors));
                }
            }
            ReportKind::Market => {}
            ReportKind::Memo => {
                outcome.memo = Some(parse_memo(text));
                if report.origin == ReportOrigin::Model
                    && store.get_startup(&request.subject_id)?.is_some()
                {
                    store.set_startup_memo(&request.subject_id, text)?;
                }
            }
        }

        outcome.report_id = Some(store.save_report(&report)?);
        info!(
            subject_id = %request.subject_id,
            kind = %request.kind,
            origin = report.origin.as_str(),
            competitors = outcome.competitors.len(),
            "report recorded"
        );
        Ok(outcome)
    }

    /// Turns a research report into stored competitor rows.
    ///
    /// Uses `report_text` when given, otherwise the latest stored
    /// competitor report.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when there is no report to process.
    pub async fn process_competitors(
        &self,
        subject_id: &str,
        report_text: Option<String>,
    ) -> Result<ProcessOutcome> {
        let text = match report_text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None => lock(&self.storage)?
                .latest_report(subject_id, ReportKind::Competitors)?
                .map(|r| r.report_text)
                .ok_or_else(|| StorageError::NotFound {
                    entity: "competitors report",
                    id: subject_id.to_string(),
                })?,
        };

        let agent = ProcessorAgent::new(
            self.generator.config(),
            self.generator.prompts().processor.clone(),
        );
        let processed = agent
            .process(self.generator.provider().as_ref(), &text)
            .await;

        let saved = {
            let mut store = lock(&self.storage)?;
            persist(&mut *store, subject_id, &processed.competitors)
        };

        let mut errors = processed.errors;
        errors.extend(saved.errors);
        info!(
            subject_id,
            processed = processed.competitors.len(),
            inserted = saved.inserted,
            updated = saved.updated,
            "competitors processed"
        );
        Ok(ProcessOutcome {
            processed_count: processed.competitors.len(),
            competitors: processed.competitors,
            inserted: saved.inserted,
            updated: saved.updated,
            errors,
        })
    }

    /// Reviews a document and stores the review when `startup_id` is given.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] for an empty name or
    /// content, and storage errors from saving.
    pub async fn process_document(
        &self,
        startup_id: Option<&str>,
        input: &DocumentInput<'_>,
    ) -> Result<DocumentOutcome> {
        if input.name.trim().is_empty() || input.content.trim().is_empty() {
            return Err(CommandError::InvalidArgument(
                "document name and content are required".to_string(),
            )
            .into());
        }

        let agent = DocumentAgent::new(
            self.generator.config(),
            self.generator.prompts().documents.clone(),
        );
        let document = agent
            .review(self.generator.provider().as_ref(), input)
            .await;

        let document_id = match startup_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Some(lock(&self.storage)?.add_document(id, &document)?),
            None => None,
        };
        Ok(DocumentOutcome {
            document,
            document_id,
        })
    }

    /// Loads the stored startup with its metrics and reviewed documents.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] for a blank id and
    /// [`StorageError::NotFound`] when the startup is not stored.
    pub fn startup_context(&self, startup_id: &str) -> Result<StartupContext> {
        let id = startup_id.trim();
        if id.is_empty() {
            return Err(CommandError::InvalidArgument("startup id is required".to_string()).into());
        }
        let store = lock(&self.storage)?;
        let startup = store.get_startup(id)?.ok_or_else(|| StorageError::NotFound {
            entity: "startup",
            id: id.to_string(),
        })?;
        let metrics = store.get_metrics(id)?.filter(|m| !m.is_empty());
        let documents = store
            .list_documents(id)?
            .into_iter()
            .map(|row| row.summary)
            .collect();
        Ok(StartupContext {
            startup,
            metrics,
            documents,
        })
    }

    /// Investment analysis over everything on file for a startup.
    ///
    /// # Errors
    ///
    /// As [`Self::startup_context`], plus storage errors from saving.
    pub async fn analyze_startup(&self, startup_id: &str) -> Result<AnalysisOutcome> {
        self.run_analysis(startup_id, AnalysisKind::Investment).await
    }

    /// Executive summary of a startup.
    ///
    /// # Errors
    ///
    /// As [`Self::startup_context`], plus storage errors from saving.
    pub async fn summarize_startup(&self, startup_id: &str) -> Result<AnalysisOutcome> {
        self.run_analysis(startup_id, AnalysisKind::Summary).await
    }

    async fn run_analysis(&self, startup_id: &str, kind: AnalysisKind) -> Result<AnalysisOutcome> {
        let ctx = self.startup_context(startup_id)?;
        info!(
            startup_id = %ctx.startup.id,
            kind = %kind,
            documents = ctx.documents.len(),
            "analyzing startup"
        );
        let agent = self.advisor();
        let provider = self.generator.provider();
        let answer = match kind {
            AnalysisKind::Investment => agent.analyze(provider.as_ref(), &ctx).await,
            AnalysisKind::Summary => agent.summarize(provider.as_ref(), &ctx).await,
        };

        let analysis_id = if answer.is_fallback() {
            debug!(startup_id = %ctx.startup.id, "fallback analysis not stored");
            None
        } else {
            Some(lock(&self.storage)?.save_analysis(&ctx.startup.id, kind, &answer.text)?)
        };
        let AdvisorAnswer { text, origin } = answer;
        Ok(AnalysisOutcome {
            kind,
            documents_count: ctx.documents.len(),
            has_metrics: ctx.metrics.is_some(),
            startup_id: ctx.startup.id,
            startup_name: ctx.startup.name,
            content: text,
            origin,
            analysis_id,
        })
    }

    /// Answers an analyst message about a stored startup.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] for a blank message, and
    /// the errors of [`Self::startup_context`].
    pub async fn chat(
        &self,
        startup_id: &str,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<ChatOutcome> {
        if message.trim().is_empty() {
            return Err(CommandError::InvalidArgument("message is required".to_string()).into());
        }
        let mut ctx = self.startup_context(startup_id)?;
        let skip = ctx.documents.len().saturating_sub(CHAT_DOCUMENTS);
        ctx.documents.drain(..skip);
        debug!(startup_id = %ctx.startup.id, turns = history.len(), "chat message");

        let answer = self
            .advisor()
            .chat(self.generator.provider().as_ref(), &ctx, history, message)
            .await;
        Ok(ChatOutcome {
            response: answer.text,
            startup_name: ctx.startup.name,
            origin: answer.origin,
        })
    }

    fn advisor(&self) -> AdvisorAgent {
        AdvisorAgent::new(self.generator.config(), self.generator.prompts().advisor.clone())
    }
}

fn prior_record(row: &StoredCompetitor) -> PriorRecord {
    PriorRecord {
        name: row.name.clone(),
        description: row.description.clone(),
    }
}
