use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use massedit_core::{FieldValue, Record, RecordId};

use crate::error::StorageError;
use crate::traits::{store_source, AuditRow, AuditSink, RecordStore, HISTORY_SOURCE};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct SqliteStorage {
    conn: Connection,
    sink: Option<Arc<dyn AuditSink>>,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn, sink: None })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn, sink: None })
    }

    /// Attach the live audit sink. Durable audit rows are written either
    /// way; only the live tail needs this.
    pub fn set_audit_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.sink = Some(sink);
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn audit(
        &self,
        source: &str,
        message: &str,
        record_id: Option<RecordId>,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO audit_log (source, message, record_id, at_ms) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                source,
                message,
                record_id.as_ref().map(|id| id.as_bytes().as_slice()),
                now_ms() as i64,
            ],
        )?;
        if let Some(sink) = &self.sink {
            sink.publish(source, message);
        }
        Ok(())
    }

    fn load_fields(&self, record: &mut Record) -> Result<(), StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT field_key, value FROM fields WHERE record_id = ?1")?;
        let rows = stmt.query_map(
            rusqlite::params![record.record_id.as_bytes().as_slice()],
            |row| {
                let key: String = row.get(0)?;
                let value: Vec<u8> = row.get(1)?;
                Ok((key, value))
            },
        )?;
        for row in rows {
            let (key, bytes) = row?;
            let value = FieldValue::from_msgpack(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            record.set(key, value);
        }
        Ok(())
    }

    fn load_live_record(
        &self,
        entity_type: &str,
        record_id: RecordId,
    ) -> Result<Option<Record>, StorageError> {
        let row: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT record_id FROM records
                 WHERE record_id = ?1 AND entity_type = ?2
                   AND deleted_at IS NULL AND restricted = 0",
                rusqlite::params![record_id.as_bytes().as_slice(), entity_type],
                |row| row.get(0),
            )
            .optional()?;
        match row {
            Some(bytes) => {
                let id = RecordId::from_bytes(to_array::<16>(bytes, "record_id")?);
                let mut record = Record::new(id, entity_type);
                self.load_fields(&mut record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

impl RecordStore for SqliteStorage {
    fn insert_record(&mut self, record: &Record) -> Result<(), StorageError> {
        let now = now_ms() as i64;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO records (record_id, entity_type, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                record.record_id.as_bytes().as_slice(),
                record.entity_type,
                now,
                now,
            ],
        )?;
        for (key, value) in record.fields() {
            let bytes = value
                .to_msgpack()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            tx.execute(
                "INSERT INTO fields (record_id, field_key, value, updated_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![record.record_id.as_bytes().as_slice(), key, bytes, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_record(&self, record_id: RecordId) -> Result<Option<Record>, StorageError> {
        let row: Option<String> = self
            .conn
            .query_row(
                "SELECT entity_type FROM records WHERE record_id = ?1 AND deleted_at IS NULL",
                rusqlite::params![record_id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        match row {
            Some(entity_type) => {
                let mut record = Record::new(record_id, entity_type);
                self.load_fields(&mut record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn resolve_selection(
        &self,
        entity_type: &str,
        ids: &[RecordId],
    ) -> Result<Vec<Record>, StorageError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.load_live_record(entity_type, *id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn update_record(&mut self, record: &Record) -> Result<(), StorageError> {
        let now = now_ms() as i64;
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE records SET updated_at = ?1 WHERE record_id = ?2 AND deleted_at IS NULL",
            rusqlite::params![now, record.record_id.as_bytes().as_slice()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(record.record_id.to_string()));
        }

        for (key, value) in record.fields() {
            let bytes = value
                .to_msgpack()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            tx.execute(
                "INSERT INTO fields (record_id, field_key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (record_id, field_key) DO UPDATE SET value = ?3, updated_at = ?4",
                rusqlite::params![record.record_id.as_bytes().as_slice(), key, bytes, now],
            )?;
        }
        tx.commit()?;

        debug!(record = %record.record_id, entity = %record.entity_type, "record updated");
        self.audit(
            &store_source(&record.entity_type),
            &format!("updated {} record {}", record.entity_type, record.record_id),
            Some(record.record_id),
        )?;
        self.audit(
            HISTORY_SOURCE,
            &format!("record {} modified", record.record_id),
            Some(record.record_id),
        )?;
        Ok(())
    }

    fn set_restricted(
        &mut self,
        record_id: RecordId,
        restricted: bool,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE records SET restricted = ?1 WHERE record_id = ?2",
            rusqlite::params![restricted as i64, record_id.as_bytes().as_slice()],
        )?;
        Ok(())
    }

    fn delete_record(&mut self, record_id: RecordId) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE records SET deleted_at = ?1 WHERE record_id = ?2",
            rusqlite::params![now_ms() as i64, record_id.as_bytes().as_slice()],
        )?;
        Ok(())
    }

    fn set_favorite(&mut self, record_id: RecordId, favorite: bool) -> Result<(), StorageError> {
        if favorite {
            self.conn.execute(
                "INSERT OR IGNORE INTO favorites (record_id, flagged_at) VALUES (?1, ?2)",
                rusqlite::params![record_id.as_bytes().as_slice(), now_ms() as i64],
            )?;
        } else {
            self.conn.execute(
                "DELETE FROM favorites WHERE record_id = ?1",
                rusqlite::params![record_id.as_bytes().as_slice()],
            )?;
        }
        Ok(())
    }

    fn is_favorite(&self, record_id: RecordId) -> Result<bool, StorageError> {
        let row: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM favorites WHERE record_id = ?1",
                rusqlite::params![record_id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    fn audit_rows(&self, limit: usize) -> Result<Vec<AuditRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT source, message, record_id, at_ms FROM audit_log
             ORDER BY rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], |row| {
            let source: String = row.get(0)?;
            let message: String = row.get(1)?;
            let record_id: Option<Vec<u8>> = row.get(2)?;
            let at_ms: i64 = row.get(3)?;
            Ok((source, message, record_id, at_ms))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (source, message, record_id, at_ms) = row?;
            let record_id = match record_id {
                Some(bytes) => Some(RecordId::from_bytes(to_array::<16>(bytes, "record_id")?)),
                None => None,
            };
            out.push(AuditRow {
                source,
                message,
                record_id,
                at_ms: at_ms as u64,
            });
        }
        out.reverse();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(store: &mut SqliteStorage, entity: &str, name: &str) -> RecordId {
        let id = RecordId::new();
        let record =
            Record::new(id, entity).with_field("name", FieldValue::Text(name.into()));
        store.insert_record(&record).unwrap();
        id
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let id = seed(&mut store, "Address", "Doe");

        let record = store.get_record(id).unwrap().unwrap();
        assert_eq!(record.entity_type, "Address");
        assert_eq!(record.value("name"), FieldValue::Text("Doe".into()));
    }

    #[test]
    fn resolve_selection_omits_missing_deleted_and_restricted() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let a = seed(&mut store, "Address", "a");
        let b = seed(&mut store, "Address", "b");
        let c = seed(&mut store, "Address", "c");
        let ghost = RecordId::new();

        store.set_restricted(b, true).unwrap();
        store.delete_record(c).unwrap();

        let records = store
            .resolve_selection("Address", &[a, b, c, ghost])
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, a);
    }

    #[test]
    fn resolve_selection_filters_by_entity_type() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let a = seed(&mut store, "Address", "a");
        let t = seed(&mut store, "Timesheet", "t");

        let records = store.resolve_selection("Address", &[a, t]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, a);
    }

    #[test]
    fn update_writes_audit_rows() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let id = seed(&mut store, "Address", "Doe");

        let mut record = store.get_record(id).unwrap().unwrap();
        record.set("name", FieldValue::Text("Smith".into()));
        store.update_record(&record).unwrap();

        let rows = store.audit_rows(10).unwrap();
        assert!(rows
            .iter()
            .any(|r| r.source == store_source("Address") && r.record_id == Some(id)));
        assert!(rows.iter().any(|r| r.source == HISTORY_SOURCE));

        let record = store.get_record(id).unwrap().unwrap();
        assert_eq!(record.value("name"), FieldValue::Text("Smith".into()));
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let record = Record::new(RecordId::new(), "Address");
        assert!(matches!(
            store.update_record(&record),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn favorite_flag_roundtrip() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let id = seed(&mut store, "Address", "Doe");

        assert!(!store.is_favorite(id).unwrap());
        store.set_favorite(id, true).unwrap();
        assert!(store.is_favorite(id).unwrap());
        // Setting again is idempotent.
        store.set_favorite(id, true).unwrap();
        store.set_favorite(id, false).unwrap();
        assert!(!store.is_favorite(id).unwrap());
    }

    #[test]
    fn on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let path = path.to_str().unwrap();

        let id = {
            let mut store = SqliteStorage::open(path).unwrap();
            seed(&mut store, "Address", "Doe")
        };

        let store = SqliteStorage::open(path).unwrap();
        let record = store.get_record(id).unwrap().unwrap();
        assert_eq!(record.value("name"), FieldValue::Text("Doe".into()));
    }
}
