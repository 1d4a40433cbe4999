//! Relational store for startups and everything researched about them.
//!
//! [`Storage`] is the seam the pipeline and HTTP layer program against;
//! [`SqliteStorage`] is the only implementation. Rows belong to exactly
//! one startup and there is no cross-startup querying.

mod schema;
mod sqlite;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStorage;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::core::{
    AnalysisKind, CompetitorProfile, DocumentSummary, GeneratedReport, Metrics, ReportKind,
    Startup, StoredAnalysis, StoredCompetitor, StoredDocument, StoredReport,
};
use crate::error::{Result, StorageError};

/// Database location used when `--db-path` is not given.
pub const DEFAULT_DB_PATH: &str = ".dealroom/dealroom.db";

/// Store shared between request handlers and tool executors.
///
/// The lock is taken for one synchronous storage call at a time and never
/// held across an `.await`.
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Wraps a store for sharing.
#[must_use]
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks a shared store.
///
/// # Errors
///
/// Returns [`StorageError::LockPoisoned`] if a previous holder panicked.
pub fn lock(storage: &SharedStorage) -> Result<MutexGuard<'_, SqliteStorage>> {
    storage
        .lock()
        .map_err(|_| StorageError::LockPoisoned.into())
}

/// Row counts reported by `dealroom status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    /// Schema version on disk.
    pub schema_version: u32,
    /// Number of startups.
    pub startups: usize,
    /// Number of competitors across all startups.
    pub competitors: usize,
    /// Number of stored reports.
    pub reports: usize,
    /// Number of processed documents.
    pub documents: usize,
}

/// Storage operations.
pub trait Storage {
    /// Creates the schema. Safe to call repeatedly.
    fn init(&mut self) -> Result<()>;

    /// Returns `true` once [`Storage::init`] has run.
    fn is_initialized(&self) -> Result<bool>;

    /// Drops and recreates every table.
    fn reset(&mut self) -> Result<()>;

    /// Row counts.
    fn stats(&self) -> Result<StorageStats>;

    // ---- startups ----

    /// Inserts or replaces a startup by id.
    fn save_startup(&mut self, startup: &Startup) -> Result<()>;

    /// Loads a startup by id.
    fn get_startup(&self, id: &str) -> Result<Option<Startup>>;

    /// Lists startups by name.
    fn list_startups(&self) -> Result<Vec<Startup>>;

    /// Stores the latest memo on the startup row.
    fn set_startup_memo(&mut self, id: &str, memo: &str) -> Result<()>;

    // ---- competitors ----

    /// Finds a competitor by natural key, case-insensitively.
    fn find_competitor(&self, startup_id: &str, name: &str) -> Result<Option<StoredCompetitor>>;

    /// Inserts a competitor, filling absent fields with defaults. Returns the new id.
    fn insert_competitor(&mut self, startup_id: &str, profile: &CompetitorProfile)
    -> Result<String>;

    /// Updates only the fields present in `profile` and marks the row researched.
    fn update_competitor(&mut self, id: &str, profile: &CompetitorProfile) -> Result<()>;

    /// Lists a startup's competitors, most similar first.
    fn list_competitors(&self, startup_id: &str) -> Result<Vec<StoredCompetitor>>;

    // ---- metrics ----

    /// Upserts metrics; absent fields keep their stored value.
    fn upsert_metrics(&mut self, startup_id: &str, metrics: &Metrics) -> Result<()>;

    /// Loads metrics for a startup.
    fn get_metrics(&self, startup_id: &str) -> Result<Option<Metrics>>;

    // ---- reports ----

    /// Appends a report to the history. Returns the row id.
    fn save_report(&mut self, report: &GeneratedReport) -> Result<i64>;

    /// Newest report of a kind.
    fn latest_report(&self, startup_id: &str, kind: ReportKind) -> Result<Option<StoredReport>>;

    /// Newest `limit` reports of a kind, newest first.
    fn report_history(
        &self,
        startup_id: &str,
        kind: ReportKind,
        limit: usize,
    ) -> Result<Vec<StoredReport>>;

    // ---- documents ----

    /// Stores a processed document. Returns the row id.
    fn add_document(&mut self, startup_id: &str, document: &DocumentSummary) -> Result<i64>;

    /// Lists a startup's documents, oldest first.
    fn list_documents(&self, startup_id: &str) -> Result<Vec<StoredDocument>>;

    // ---- analyses ----

    /// Appends an analysis. Returns the row id.
    fn save_analysis(
        &mut self,
        startup_id: &str,
        kind: AnalysisKind,
        content: &str,
    ) -> Result<i64>;

    /// Latest analyses of a startup, newest first, optionally of one kind.
    fn list_analyses(
        &self,
        startup_id: &str,
        kind: Option<AnalysisKind>,
        limit: usize,
    ) -> Result<Vec<StoredAnalysis>>;
}
