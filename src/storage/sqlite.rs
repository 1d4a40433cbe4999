//! `SQLite` implementation of [`Storage`].

use std::path::Path;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::schema::{SCHEMA_SQL, SCHEMA_VERSION, TABLES};
use super::{Storage, StorageStats};
use crate::core::{
    AnalysisKind, CompetitorProfile, DEFAULT_SIMILARITY, DocumentSummary, GeneratedReport,
    Metrics, ReportKind, ReportOrigin, ReportStatus, Startup, StoredAnalysis, StoredCompetitor,
    StoredDocument, StoredReport,
};
use crate::error::{Result, StorageError};

const COMPETITOR_COLUMNS: &str = "id, startup_id, competitor_name, description, founded_year, \
     employee_count, funding_raised, revenue, linkedin_url, website_url, main_features, \
     similarity_score, is_external, research_status, created_at, updated_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const REPORT_COLUMNS: &str = "id, startup_id, kind, action, report_text, status, origin, created_at";

/// A single `SQLite` connection.
///
/// Not `Sync`; share it behind a mutex.
pub struct SqliteStorage {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStorage {
    /// Opens (or creates) a database file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory or database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(StorageError::from)?;
        }

        let conn = Connection::open(path).map_err(StorageError::from)?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(StorageError::from)?;
        debug!(path = %path.display(), "opened database");
        Ok(Self { conn })
    }

    /// Opens an in-memory database (tests, `--offline` dry runs).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if `SQLite` cannot allocate the database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    fn count(&self, table: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .map_err(StorageError::from)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

fn startup_from_row(row: &Row<'_>) -> rusqlite::Result<Startup> {
    Ok(Startup {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        sector: row.get(3)?,
        stage: row.get(4)?,
        country: row.get(5)?,
        team_info: row.get(6)?,
        memo: row.get(7)?,
    })
}

fn competitor_from_row(row: &Row<'_>) -> rusqlite::Result<StoredCompetitor> {
    Ok(StoredCompetitor {
        id: row.get(0)?,
        startup_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        founded_year: row.get(4)?,
        employee_count: row.get(5)?,
        funding_raised: row.get(6)?,
        revenue: row.get(7)?,
        linkedin_url: row.get(8)?,
        website_url: row.get(9)?,
        main_features: row.get(10)?,
        similarity_score: row.get(11)?,
        is_external: row.get::<_, i64>(12)? != 0,
        research_status: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<StoredReport> {
    let kind: String = row.get(2)?;
    let status: String = row.get(5)?;
    let origin: String = row.get(6)?;
    Ok(StoredReport {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        kind: ReportKind::parse(&kind)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        action: row.get(3)?,
        report_text: row.get(4)?,
        status: ReportStatus::parse(&status),
        origin: ReportOrigin::parse(&origin),
        created_at: row.get(7)?,
    })
}

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<StoredAnalysis> {
    let kind: String = row.get(2)?;
    Ok(StoredAnalysis {
        id: row.get(0)?,
        startup_id: row.get(1)?,
        kind: AnalysisKind::parse(&kind)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn metrics_from_row(row: &Row<'_>) -> rusqlite::Result<Metrics> {
    Ok(Metrics {
        arr: row.get(0)?,
        mrr: row.get(1)?,
        cac: row.get(2)?,
        ltv: row.get(3)?,
        churn_rate: row.get(4)?,
        runway_months: row.get(5)?,
        burn_rate: row.get(6)?,
        customer_count: row.get(7)?,
        revenue_growth: row.get(8)?,
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<StoredDocument> {
    Ok(StoredDocument {
        id: row.get(0)?,
        startup_id: row.get(1)?,
        summary: DocumentSummary {
            name: row.get(2)?,
            doc_type: row.get(3)?,
            summary: row.get(4)?,
            kpis: row.get(5)?,
            red_flags: row.get(6)?,
        },
        created_at: row.get(7)?,
    })
}

impl Storage for SqliteStorage {
    fn init(&mut self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(StorageError::from)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'metadata'",
                [],
                |r| r.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(found.is_some())
    }

    fn reset(&mut self) -> Result<()> {
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        for table in TABLES {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))
                .map_err(StorageError::from)?;
        }
        tx.commit().map_err(StorageError::from)?;
        self.init()
    }

    fn stats(&self) -> Result<StorageStats> {
        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |r| r.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;

        Ok(StorageStats {
            schema_version: version.and_then(|v| v.parse().ok()).unwrap_or(0),
            startups: self.count("startups")?,
            competitors: self.count("competitors")?,
            reports: self.count("reports")?,
            documents: self.count("documents")?,
        })
    }

    fn save_startup(&mut self, startup: &Startup) -> Result<()> {
        if startup.name.trim().is_empty() {
            return Err(StorageError::InvalidRecord("startup name is empty".to_string()).into());
        }
        self.conn
            .execute(
                "INSERT INTO startups (id, name, description, sector, stage, country, team_info, memo)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    sector = excluded.sector,
                    stage = excluded.stage,
                    country = excluded.country,
                    team_info = excluded.team_info,
                    memo = COALESCE(excluded.memo, startups.memo),
                    updated_at = CURRENT_TIMESTAMP",
                params![
                    startup.id,
                    startup.name,
                    startup.description,
                    startup.sector,
                    startup.stage,
                    startup.country,
                    startup.team_info,
                    startup.memo,
                ],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn get_startup(&self, id: &str) -> Result<Option<Startup>> {
        let startup = self
            .conn
            .query_row(
                "SELECT id, name, description, sector, stage, country, team_info, memo
                 FROM startups WHERE id = ?1",
                params![id],
                startup_from_row,
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(startup)
    }

    fn list_startups(&self) -> Result<Vec<Startup>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, sector, stage, country, team_info, memo
                 FROM startups ORDER BY name COLLATE NOCASE",
            )
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map([], startup_from_row)
            .map_err(StorageError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }

    fn set_startup_memo(&mut self, id: &str, memo: &str) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE startups SET memo = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![memo, id],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "startup",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn find_competitor(&self, startup_id: &str, name: &str) -> Result<Option<StoredCompetitor>> {
        let sql = format!(
            "SELECT {COMPETITOR_COLUMNS} FROM competitors
             WHERE startup_id = ?1 AND competitor_name = ?2 COLLATE NOCASE"
        );
        let found = self
            .conn
            .query_row(&sql, params![startup_id, name.trim()], competitor_from_row)
            .optional()
            .map_err(StorageError::from)?;
        Ok(found)
    }

    fn insert_competitor(
        &mut self,
        startup_id: &str,
        profile: &CompetitorProfile,
    ) -> Result<String> {
        let name = profile.name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidRecord("competitor name is empty".to_string()).into());
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO competitors (
                    id, startup_id, competitor_name, description, founded_year, employee_count,
                    funding_raised, revenue, linkedin_url, website_url, main_features,
                    similarity_score, is_external, research_status
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, 'completed')",
                params![
                    id,
                    startup_id,
                    name,
                    profile.description.as_deref().unwrap_or(""),
                    profile.founded_year.unwrap_or(0),
                    profile.employee_count.unwrap_or(0),
                    profile.funding_raised.unwrap_or(0.0),
                    profile.revenue.unwrap_or(0.0),
                    profile.linkedin_url.as_deref().unwrap_or(""),
                    profile.website_url.as_deref().unwrap_or(""),
                    profile.main_features.as_deref().unwrap_or(""),
                    profile.similarity_score.unwrap_or(DEFAULT_SIMILARITY),
                ],
            )
            .map_err(StorageError::from)?;
        Ok(id)
    }

    fn update_competitor(&mut self, id: &str, profile: &CompetitorProfile) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE competitors SET
                    description = COALESCE(?1, description),
                    founded_year = COALESCE(?2, founded_year),
                    employee_count = COALESCE(?3, employee_count),
                    funding_raised = COALESCE(?4, funding_raised),
                    revenue = COALESCE(?5, revenue),
                    linkedin_url = COALESCE(?6, linkedin_url),
                    website_url = COALESCE(?7, website_url),
                    main_features = COALESCE(?8, main_features),
                    similarity_score = COALESCE(?9, similarity_score),
                    research_status = 'completed',
                    updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?10",
                params![
                    profile.description,
                    profile.founded_year,
                    profile.employee_count,
                    profile.funding_raised,
                    profile.revenue,
                    profile.linkedin_url,
                    profile.website_url,
                    profile.main_features,
                    profile.similarity_score,
                    id,
                ],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: "competitor",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn list_competitors(&self, startup_id: &str) -> Result<Vec<StoredCompetitor>> {
        let sql = format!(
            "SELECT {COMPETITOR_COLUMNS} FROM competitors WHERE startup_id = ?1
             ORDER BY similarity_score DESC, competitor_name COLLATE NOCASE"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![startup_id], competitor_from_row)
            .map_err(StorageError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }

    fn upsert_metrics(&mut self, startup_id: &str, metrics: &Metrics) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO metrics (
                    startup_id, arr, mrr, cac, ltv, churn_rate, runway_months, burn_rate,
                    customer_count, revenue_growth
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(startup_id) DO UPDATE SET
                    arr = COALESCE(excluded.arr, metrics.arr),
                    mrr = COALESCE(excluded.mrr, metrics.mrr),
                    cac = COALESCE(excluded.cac, metrics.cac),
                    ltv = COALESCE(excluded.ltv, metrics.ltv),
                    churn_rate = COALESCE(excluded.churn_rate, metrics.churn_rate),
                    runway_months = COALESCE(excluded.runway_months, metrics.runway_months),
                    burn_rate = COALESCE(excluded.burn_rate, metrics.burn_rate),
                    customer_count = COALESCE(excluded.customer_count, metrics.customer_count),
                    revenue_growth = COALESCE(excluded.revenue_growth, metrics.revenue_growth),
                    updated_at = CURRENT_TIMESTAMP",
                params![
                    startup_id,
                    metrics.arr,
                    metrics.mrr,
                    metrics.cac,
                    metrics.ltv,
                    metrics.churn_rate,
                    metrics.runway_months,
                    metrics.burn_rate,
                    metrics.customer_count,
                    metrics.revenue_growth,
                ],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn get_metrics(&self, startup_id: &str) -> Result<Option<Metrics>> {
        let metrics = self
            .conn
            .query_row(
                "SELECT arr, mrr, cac, ltv, churn_rate, runway_months, burn_rate,
                        customer_count, revenue_growth
                 FROM metrics WHERE startup_id = ?1",
                params![startup_id],
                metrics_from_row,
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(metrics)
    }

    fn save_report(&mut self, report: &GeneratedReport) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO reports (startup_id, kind, action, report_text, status, origin)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    report.subject_id,
                    report.kind.as_str(),
                    report.action.as_str(),
                    report.report_text,
                    report.status.as_str(),
                    report.origin.as_str(),
                ],
            )
            .map_err(StorageError::from)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_report(&self, startup_id: &str, kind: ReportKind) -> Result<Option<StoredReport>> {
        Ok(self.report_history(startup_id, kind, 1)?.into_iter().next())
    }

    fn report_history(
        &self,
        startup_id: &str,
        kind: ReportKind,
        limit: usize,
    ) -> Result<Vec<StoredReport>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE startup_id = ?1 AND kind = ?2
             ORDER BY id DESC LIMIT ?3"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![startup_id, kind.as_str(), limit], report_from_row)
            .map_err(StorageError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }

    fn add_document(&mut self, startup_id: &str, document: &DocumentSummary) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO documents (startup_id, name, doc_type, summary, kpis, red_flags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    startup_id,
                    document.name,
                    document.doc_type,
                    document.summary,
                    document.kpis,
                    document.red_flags,
                ],
            )
            .map_err(StorageError::from)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_documents(&self, startup_id: &str) -> Result<Vec<StoredDocument>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, startup_id, name, doc_type, summary, kpis, red_flags, created_at
                 FROM documents WHERE startup_id = ?1 ORDER BY id",
            )
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![startup_id], document_from_row)
            .map_err(StorageError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }

    fn save_analysis(
        &mut self,
        startup_id: &str,
        kind: AnalysisKind,
        content: &str,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO analyses (startup_id, kind, content) VALUES (?1, ?2, ?3)",
                params![startup_id, kind.as_str(), content],
            )
            .map_err(StorageError::from)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_analyses(
        &self,
        startup_id: &str,
        kind: Option<AnalysisKind>,
        limit: usize,
    ) -> Result<Vec<StoredAnalysis>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, startup_id, kind, content, created_at FROM analyses
                 WHERE startup_id = ?1 AND (?2 IS NULL OR kind = ?2)
                 ORDER BY id DESC LIMIT ?3",
            )
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map(
                params![startup_id, kind.map(|k| k.as_str()), limit],
                analysis_from_row,
            )
            .map_err(StorageError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ReportAction;

    fn setup() -> SqliteStorage {
        let mut storage = SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!());
        storage.init().unwrap_or_else(|_| unreachable!());
        storage
    }

    #[test]
    fn test_init_and_stats() {
        let storage = setup();
        assert!(storage.is_initialized().unwrap_or(false));
        let stats = storage.stats().unwrap_or_default();
        assert_eq!(stats.schema_version, SCHEMA_VERSION);
        assert_eq!(stats.startups, 0);
    }

    #[test]
    fn test_uninitialized() {
        let storage = SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!());
        assert!(!storage.is_initialized().unwrap_or(true));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("nested").join("dealroom.db");
        let mut storage = SqliteStorage::open(&path).unwrap_or_else(|_| unreachable!());
        storage.init().unwrap_or_else(|_| unreachable!());
        assert!(path.exists());
    }

    #[test]
    fn test_startup_roundtrip_and_memo() {
        let mut storage = setup();
        let startup = Startup::new("Acme").with_sector("Fintech");
        storage.save_startup(&startup).unwrap_or_else(|_| unreachable!());
        storage
            .set_startup_memo(&startup.id, "memo text")
            .unwrap_or_else(|_| unreachable!());

        let loaded = storage
            .get_startup(&startup.id)
            .ok()
            .flatten()
            .unwrap_or_default();
        assert_eq!(loaded.name, "Acme");
        assert_eq!(loaded.memo.as_deref(), Some("memo text"));

        // Re-saving without a memo keeps the stored one.
        storage.save_startup(&startup).unwrap_or_else(|_| unreachable!());
        let loaded = storage
            .get_startup(&startup.id)
            .ok()
            .flatten()
            .unwrap_or_default();
        assert_eq!(loaded.memo.as_deref(), Some("memo text"));
    }

    #[test]
    fn test_memo_for_missing_startup() {
        let mut storage = setup();
        assert!(storage.set_startup_memo("nope", "x").is_err());
    }

    #[test]
    fn test_competitor_lookup_is_case_insensitive() {
        let mut storage = setup();
        let mut profile = CompetitorProfile::named("Stripe");
        profile.description = Some("Payments".to_string());
        storage
            .insert_competitor("s1", &profile)
            .unwrap_or_else(|_| unreachable!());

        let found = storage.find_competitor("s1", "STRIPE").ok().flatten();
        assert!(found.is_some());
        assert!(storage.find_competitor("s2", "Stripe").ok().flatten().is_none());
    }

    #[test]
    fn test_unique_index_rejects_case_variant() {
        let mut storage = setup();
        let _ = storage.insert_competitor("s1", &CompetitorProfile::named("Stripe"));
        let dup = storage.insert_competitor("s1", &CompetitorProfile::named("stripe"));
        assert!(dup.is_err());
    }

    #[test]
    fn test_empty_url_is_stored_as_empty_string() {
        let mut storage = setup();
        let profile = CompetitorProfile {
            website_url: crate::extract::normalize_url(""),
            ..CompetitorProfile::named("Adyen")
        };
        assert!(profile.website_url.is_none());
        storage
            .insert_competitor("s1", &profile)
            .unwrap_or_else(|_| unreachable!());
        let row = storage
            .find_competitor("s1", "Adyen")
            .ok()
            .flatten()
            .unwrap_or_else(|| unreachable!());
        assert_eq!(row.website_url, "");
    }

    #[test]
    fn test_insert_defaults() {
        let mut storage = setup();
        storage
            .insert_competitor("s1", &CompetitorProfile::named("Adyen"))
            .unwrap_or_else(|_| unreachable!());
        let row = storage
            .find_competitor("s1", "Adyen")
            .ok()
            .flatten()
            .unwrap_or_else(|| unreachable!());
        assert_eq!(row.founded_year, 0);
        assert_eq!(row.description, "");
        assert!((row.similarity_score - 0.8).abs() < f64::EPSILON);
        assert!(row.is_external);
        assert_eq!(row.research_status, "completed");
    }

    #[test]
    fn test_metrics_coalesce() {
        let mut storage = setup();
        let first = Metrics {
            arr: Some(100.0),
            mrr: Some(10.0),
            ..Metrics::default()
        };
        storage.upsert_metrics("s1", &first).unwrap_or_else(|_| unreachable!());
        let second = Metrics {
            mrr: Some(12.0),
            ..Metrics::default()
        };
        storage.upsert_metrics("s1", &second).unwrap_or_else(|_| unreachable!());

        let stored = storage.get_metrics("s1").ok().flatten().unwrap_or_default();
        assert_eq!(stored.arr, Some(100.0));
        assert_eq!(stored.mrr, Some(12.0));
    }

    #[test]
    fn test_report_history_newest_first() {
        let mut storage = setup();
        for text in ["one", "two", "three"] {
            let report = GeneratedReport {
                subject_id: "s1".to_string(),
                kind: ReportKind::Market,
                action: ReportAction::Research,
                report_text: text.to_string(),
                status: ReportStatus::Completed,
                origin: ReportOrigin::Model,
            };
            storage.save_report(&report).unwrap_or_else(|_| unreachable!());
        }

        let latest = storage
            .latest_report("s1", ReportKind::Market)
            .ok()
            .flatten()
            .map(|r| r.report_text);
        assert_eq!(latest.as_deref(), Some("three"));

        let history = storage
            .report_history("s1", ReportKind::Market, 2)
            .unwrap_or_default();
        let texts: Vec<_> = history.iter().map(|r| r.report_text.as_str()).collect();
        assert_eq!(texts, vec!["three", "two"]);

        assert!(
            storage
                .latest_report("s1", ReportKind::Memo)
                .ok()
                .flatten()
                .is_none()
        );
    }

    #[test]
    fn test_unknown_report_kind_fails_row_read() {
        let mut storage = setup();
        let report = GeneratedReport {
            subject_id: "s1".to_string(),
            kind: ReportKind::Market,
            action: ReportAction::Research,
            report_text: "text".to_string(),
            status: ReportStatus::Completed,
            origin: ReportOrigin::Model,
        };
        let id = storage.save_report(&report).unwrap_or_else(|_| unreachable!());
        storage
            .conn
            .execute("UPDATE reports SET kind = 'weather' WHERE id = ?1", [id])
            .unwrap_or_else(|_| unreachable!());

        let result = storage.conn.query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
            [id],
            report_from_row,
        );
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(2, Type::Text, _))
        ));
    }

    #[test]
    fn test_documents() {
        let mut storage = setup();
        let doc = DocumentSummary {
            name: "deck.pdf".to_string(),
            summary: "A deck".to_string(),
            ..DocumentSummary::default()
        };
        storage.add_document("s1", &doc).unwrap_or_else(|_| unreachable!());
        let docs = storage.list_documents("s1").unwrap_or_default();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].summary.name, "deck.pdf");
    }

    #[test]
    fn test_analyses_newest_first_and_filtered() {
        let mut storage = setup();
        for (kind, text) in [
            (AnalysisKind::Investment, "first"),
            (AnalysisKind::Summary, "summary"),
            (AnalysisKind::Investment, "second"),
        ] {
            storage
                .save_analysis("s1", kind, text)
                .unwrap_or_else(|_| unreachable!());
        }

        let all = storage.list_analyses("s1", None, 10).unwrap_or_default();
        let texts: Vec<_> = all.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(texts, vec!["second", "summary", "first"]);

        let investment = storage
            .list_analyses("s1", Some(AnalysisKind::Investment), 1)
            .unwrap_or_default();
        assert_eq!(investment.len(), 1);
        assert_eq!(investment[0].content, "second");
        assert!(storage.list_analyses("other", None, 10).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_reset_clears_rows() {
        let mut storage = setup();
        storage
            .save_startup(&Startup::new("Acme"))
            .unwrap_or_else(|_| unreachable!());
        storage.reset().unwrap_or_else(|_| unreachable!());
        assert_eq!(storage.stats().map(|s| s.startups).unwrap_or(1), 0);
    }
}
