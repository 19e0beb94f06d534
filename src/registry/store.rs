//! SQLite schema for the lifecycle registry

/// SQL schema for the registry database
pub const SCHEMA_SQL: &str = r#"
-- Records: canonical lifecycle state per tracked agreement
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    document_id TEXT,
    content_hash TEXT NOT NULL,
    counterparty TEXT NOT NULL,
    status TEXT NOT NULL,
    effective_date TEXT,
    term_months INTEGER,
    expiry_date TEXT,
    owner TEXT,
    file_uri TEXT,
    tags_json TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Lifecycle events: scheduled expiry notifications
CREATE TABLE IF NOT EXISTS lifecycle_events (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES records(id),
    kind TEXT NOT NULL,
    scheduled_for TEXT NOT NULL,
    delivered_at TEXT,
    payload_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_records_document ON records(document_id);
CREATE INDEX IF NOT EXISTS idx_records_hash ON records(content_hash);
CREATE INDEX IF NOT EXISTS idx_records_status ON records(status);
CREATE INDEX IF NOT EXISTS idx_events_record ON lifecycle_events(record_id);
CREATE INDEX IF NOT EXISTS idx_events_pending ON lifecycle_events(scheduled_for)
    WHERE delivered_at IS NULL;

-- At most one undelivered event per (record, kind, scheduled second)
CREATE UNIQUE INDEX IF NOT EXISTS idx_events_dedup
    ON lifecycle_events(record_id, kind, scheduled_for)
    WHERE delivered_at IS NULL;
"#;
