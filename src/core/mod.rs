//! Domain types shared by the pipeline, storage and HTTP layers.

pub mod analysis;
pub mod competitor;
pub mod report;
pub mod startup;

pub use analysis::{AdvisorAnswer, AnalysisKind, ChatTurn, StoredAnalysis};
pub use competitor::{CompetitorProfile, DEFAULT_SIMILARITY, StoredCompetitor, UpsertAction};
pub use report::{
    GeneratedReport, MemoContext, PriorRecord, ReportAction, ReportKind, ReportOrigin,
    ReportRequest, ReportStatus, StoredReport,
};
pub use startup::{DocumentSummary, Metrics, Startup, StoredDocument};
