use massedit_core::{
    EntitySchema, FieldKind, FieldMode, FieldSpec, OperationPlan, Record, RecordId,
};
use massedit_engine::{EntityAdapter, PersistError};
use massedit_storage::{RecordStore, SqliteStorage};

/// Mass-update wiring for the Address entity.
///
/// `favorite` is a special field: it lives in a side table rather than on
/// the record, so the gate override declares it active itself and the
/// post-commit hook applies it after each successful persist.
pub struct AddressAdapter<'a> {
    store: &'a mut SqliteStorage,
    schema: EntitySchema,
}

impl<'a> AddressAdapter<'a> {
    pub fn new(store: &'a mut SqliteStorage) -> Self {
        Self {
            store,
            schema: address_schema(),
        }
    }
}

pub fn address_schema() -> EntitySchema {
    EntitySchema::new(
        "Address",
        vec![
            FieldSpec::new("lastname", FieldKind::Text),
            FieldSpec::new("firstname", FieldKind::Text),
            FieldSpec::new("organization", FieldKind::Text),
            FieldSpec::new("comment", FieldKind::Text),
            FieldSpec::new(
                "status",
                FieldKind::Enum {
                    default: "ACTIVE".into(),
                },
            ),
            FieldSpec::new("newsletter", FieldKind::Boolean { default: false }),
            FieldSpec::new("owner", FieldKind::Reference),
            FieldSpec::new("categories", FieldKind::ReferenceList),
        ],
    )
}

impl EntityAdapter for AddressAdapter<'_> {
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
        let parts = [
            record.display("lastname"),
            record.display("firstname"),
            record.display("organization"),
        ];
        parts
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn export_header(&self) -> Vec<String> {
        vec![
            "Lastname".into(),
            "Firstname".into(),
            "Organization".into(),
        ]
    }

    fn export_row(&self, record: &Record) -> Vec<String> {
        vec![
            record.display("lastname"),
            record.display("firstname"),
            record.display("organization"),
        ]
    }

    fn is_field_active(&self, field_id: &str, plan: &OperationPlan) -> Option<bool> {
        if field_id != "favorite" {
            return None;
        }
        let active = plan.get("favorite").is_some_and(|op| match op.mode {
            FieldMode::Set => op.boolean_value.is_some(),
            FieldMode::Delete => true,
            _ => false,
        });
        Some(active)
    }

    fn post_commit_hook(
        &mut self,
        record: &Record,
        plan: &OperationPlan,
    ) -> Result<(), PersistError> {
        let Some(op) = plan.get("favorite") else {
            return Ok(());
        };
        let flag = match op.mode {
            FieldMode::Set => match op.boolean_value {
                Some(b) => b,
                None => return Ok(()),
            },
            FieldMode::Delete => false,
            _ => return Ok(()),
        };
        self.store
            .set_favorite(record.record_id, flag)
            .map_err(PersistError::from_source)
    }
}
