use massedit_core::{Record, RecordId};

use crate::error::StorageError;

/// Generic history-logger source, shared by every entity type.
pub const HISTORY_SOURCE: &str = "massedit.history";

/// Per-entity-type store logger source, e.g. `massedit.store.Address`.
pub fn store_source(entity_type: &str) -> String {
    format!("massedit.store.{entity_type}")
}

/// Where the store publishes its audit/progress events. Wired to the
/// engine's subscription bus by the surrounding service; a store without a
/// sink still writes durable audit rows.
pub trait AuditSink: Send + Sync {
    fn publish(&self, source: &str, message: &str);
}

/// One durable audit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub source: String,
    pub message: String,
    pub record_id: Option<RecordId>,
    pub at_ms: u64,
}

pub trait RecordStore {
    fn insert_record(&mut self, record: &Record) -> Result<(), StorageError>;

    fn get_record(&self, record_id: RecordId) -> Result<Option<Record>, StorageError>;

    /// Resolve selected ids to live records of the given entity type.
    /// Missing, soft-deleted and restricted records are omitted, never
    /// errors; input order is preserved.
    fn resolve_selection(
        &self,
        entity_type: &str,
        ids: &[RecordId],
    ) -> Result<Vec<Record>, StorageError>;

    /// Persist one record's fields as an independent transaction, writing
    /// audit rows and publishing them to the sink.
    fn update_record(&mut self, record: &Record) -> Result<(), StorageError>;

    fn set_restricted(&mut self, record_id: RecordId, restricted: bool)
        -> Result<(), StorageError>;

    fn delete_record(&mut self, record_id: RecordId) -> Result<(), StorageError>;

    fn set_favorite(&mut self, record_id: RecordId, favorite: bool) -> Result<(), StorageError>;

    fn is_favorite(&self, record_id: RecordId) -> Result<bool, StorageError>;

    fn audit_rows(&self, limit: usize) -> Result<Vec<AuditRow>, StorageError>;
}
