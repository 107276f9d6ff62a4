use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS records (
    record_id BLOB PRIMARY KEY CHECK (length(record_id) = 16),
    entity_type TEXT NOT NULL,
    restricted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_records_type ON records (entity_type) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS fields (
    record_id BLOB NOT NULL CHECK (length(record_id) = 16),
    field_key TEXT NOT NULL,
    value BLOB NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (record_id, field_key)
);

CREATE TABLE IF NOT EXISTS favorites (
    record_id BLOB PRIMARY KEY CHECK (length(record_id) = 16),
    flagged_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_log (
    rowid INTEGER PRIMARY KEY,
    source TEXT NOT NULL,
    message TEXT NOT NULL,
    record_id BLOB CHECK (record_id IS NULL OR length(record_id) = 16),
    at_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_source ON audit_log (source, at_ms);
";
