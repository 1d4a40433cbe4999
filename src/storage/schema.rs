//! Database schema.

/// Current schema version, stored in `metadata`.
pub const SCHEMA_VERSION: u32 = 2;

/// Schema creation statements. Idempotent.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS startups (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    sector TEXT,
    stage TEXT,
    country TEXT,
    team_info TEXT,
    memo TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS competitors (
    id TEXT PRIMARY KEY,
    startup_id TEXT NOT NULL,
    competitor_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    founded_year INTEGER NOT NULL DEFAULT 0,
    employee_count INTEGER NOT NULL DEFAULT 0,
    funding_raised REAL NOT NULL DEFAULT 0,
    revenue REAL NOT NULL DEFAULT 0,
    linkedin_url TEXT NOT NULL DEFAULT '',
    website_url TEXT NOT NULL DEFAULT '',
    main_features TEXT NOT NULL DEFAULT '',
    similarity_score REAL NOT NULL DEFAULT 0.8,
    is_external INTEGER NOT NULL DEFAULT 1,
    research_status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_competitors_startup_name
    ON competitors(startup_id, competitor_name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS metrics (
    startup_id TEXT PRIMARY KEY,
    arr REAL,
    mrr REAL,
    cac REAL,
    ltv REAL,
    churn_rate REAL,
    runway_months REAL,
    burn_rate REAL,
    customer_count REAL,
    revenue_growth REAL,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    startup_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    action TEXT NOT NULL,
    report_text TEXT NOT NULL,
    status TEXT NOT NULL,
    origin TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_reports_startup_kind
    ON reports(startup_id, kind, id DESC);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    startup_id TEXT NOT NULL,
    name TEXT NOT NULL,
    doc_type TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    kpis TEXT NOT NULL DEFAULT '',
    red_flags TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_documents_startup ON documents(startup_id);

CREATE TABLE IF NOT EXISTS analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    startup_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_analyses_startup ON analyses(startup_id, id DESC);
";

/// Tables dropped by a reset, children first.
pub const TABLES: &[&str] = &[
    "analyses",
    "documents",
    "reports",
    "metrics",
    "competitors",
    "startups",
    "metadata",
];
