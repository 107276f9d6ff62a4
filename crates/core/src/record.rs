use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field_value::FieldValue;
use crate::ids::RecordId;

/// A loaded domain record: an id plus its current field values.
///
/// Absent and `Null` fields are equivalent; modifiers treat both as "no
/// current value".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: RecordId,
    pub entity_type: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(record_id: RecordId, entity_type: impl Into<String>) -> Self {
        Self {
            record_id,
            entity_type: entity_type.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field_id: impl Into<String>, value: FieldValue) -> Self {
        self.set(field_id, value);
        self
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldValue> {
        self.fields.get(field_id)
    }

    /// Current value of a field, with absent reading as `Null`.
    pub fn value(&self, field_id: &str) -> FieldValue {
        self.fields
            .get(field_id)
            .cloned()
            .unwrap_or(FieldValue::Null)
    }

    pub fn set(&mut self, field_id: impl Into<String>, value: FieldValue) {
        self.fields.insert(field_id.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Display text for a field, used by identity/export projections.
    pub fn display(&self, field_id: &str) -> String {
        match self.value(field_id) {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) | FieldValue::Enum(s) => s,
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Reference(id) => id.to_string(),
            FieldValue::References(ids) => ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
