use std::sync::Arc;

use massedit_core::{FieldValue, Record, RecordId};
use massedit_engine::{AuditBus, AuditEvent};
use massedit_storage::{AuditSink, RecordStore, SqliteStorage, StorageError};

use crate::address::AddressAdapter;
use crate::timesheet::TimesheetAdapter;

/// Bridges the store's audit sink to the engine's subscription bus.
struct BusSink(AuditBus);

impl AuditSink for BusSink {
    fn publish(&self, source: &str, message: &str) {
        self.0.publish(AuditEvent::new(source, message));
    }
}

/// One self-contained fixture: an in-memory store wired to a live audit bus,
/// with seed helpers and per-batch adapter constructors.
pub struct TestPeer {
    pub storage: SqliteStorage,
    pub bus: AuditBus,
}

impl TestPeer {
    pub fn new() -> Result<Self, StorageError> {
        let bus = AuditBus::new();
        let mut storage = SqliteStorage::open_in_memory()?;
        storage.set_audit_sink(Arc::new(BusSink(bus.clone())));
        Ok(Self { storage, bus })
    }

    /// Adapter for one Address batch; holds the store for its lifetime.
    pub fn address_adapter(&mut self) -> AddressAdapter<'_> {
        AddressAdapter::new(&mut self.storage)
    }

    /// Adapter for one Timesheet batch.
    pub fn timesheet_adapter(&mut self) -> TimesheetAdapter<'_> {
        TimesheetAdapter::new(&mut self.storage)
    }

    pub fn seed_address(
        &mut self,
        lastname: &str,
        firstname: &str,
        organization: &str,
    ) -> Result<RecordId, StorageError> {
        let id = RecordId::new();
        let record = Record::new(id, "Address")
            .with_field("lastname", FieldValue::Text(lastname.into()))
            .with_field("firstname", FieldValue::Text(firstname.into()))
            .with_field("organization", FieldValue::Text(organization.into()));
        self.storage.insert_record(&record)?;
        Ok(id)
    }

    pub fn seed_timesheet(&mut self, activity: &str) -> Result<RecordId, StorageError> {
        let id = RecordId::new();
        let record = Record::new(id, "Timesheet")
            .with_field("activity", FieldValue::Text(activity.into()));
        self.storage.insert_record(&record)?;
        Ok(id)
    }
}
