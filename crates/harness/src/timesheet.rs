use massedit_core::{EntitySchema, FieldKind, FieldSpec, Record, RecordId};
use massedit_engine::{EntityAdapter, PersistError};
use massedit_storage::{RecordStore, SqliteStorage};

/// Mass-update wiring for the Timesheet entity. No special fields; the
/// generic gate and modifiers cover everything.
pub struct TimesheetAdapter<'a> {
    store: &'a mut SqliteStorage,
    schema: EntitySchema,
}

impl<'a> TimesheetAdapter<'a> {
    pub fn new(store: &'a mut SqliteStorage) -> Self {
        Self {
            store,
            schema: timesheet_schema(),
        }
    }
}

pub fn timesheet_schema() -> EntitySchema {
    EntitySchema::new(
        "Timesheet",
        vec![
            FieldSpec::new("activity", FieldKind::Text),
            FieldSpec::new("description", FieldKind::Text),
            FieldSpec::new("billable", FieldKind::Boolean { default: false }),
            FieldSpec::new(
                "approval",
                FieldKind::Enum {
                    default: "OPEN".into(),
                },
            ),
            FieldSpec::new("project", FieldKind::Reference),
            FieldSpec::new("tags", FieldKind::ReferenceList),
        ],
    )
}

impl EntityAdapter for TimesheetAdapter<'_> {
    fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    fn resolve_selection(&self, ids: &[RecordId]) -> Result<Vec<Record>, PersistError> {
        self.store
            .resolve_selection(&self.schema.entity_type, ids)
            .map_err(PersistError::from_source)
    }

    fn update(&mut self, record: &Record) -> Result<(), PersistError> {
        self.store
            .update_record(record)
            .map_err(PersistError::from_source)
    }

    fn identity_label(&self, record: &Record) -> String {
        let activity = record.display("activity");
        let project = record.display("project");
        if project.is_empty() {
            activity
        } else {
            format!("{activity} ({project})")
        }
    }

    fn export_header(&self) -> Vec<String> {
        vec!["Activity".into(), "Approval".into(), "Billable".into()]
    }

    fn export_row(&self, record: &Record) -> Vec<String> {
        vec![
            record.display("activity"),
            record.display("approval"),
            record.display("billable"),
        ]
    }
}
