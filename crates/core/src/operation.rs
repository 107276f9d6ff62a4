use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::ReferenceId;

/// The requested transformation for one field. `None` (or an absent entry)
/// means the field is untouched by the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    None,
    Set,
    Append,
    Delete,
    Replace,
}

impl FieldMode {
    /// String name of the mode for logging/audit rows.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Set => "SET",
            Self::Append => "APPEND",
            Self::Delete => "DELETE",
            Self::Replace => "REPLACE",
        }
    }
}

/// One field's requested change, as submitted by the client.
///
/// Exactly one payload slot is meaningful, selected by the target field's
/// declared kind. `replace_with` is the second string of a `Replace` pair
/// (`text_value` holds the search term). `append` is the explicit per-field
/// opt-in for list appends; a bare `reference_id` without it is inactive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldOperation {
    pub mode: FieldMode,
    pub text_value: Option<String>,
    pub replace_with: Option<String>,
    pub boolean_value: Option<bool>,
    pub reference_id: Option<ReferenceId>,
    pub append: bool,
}

impl FieldOperation {
    pub fn set_text(value: impl Into<String>) -> Self {
        Self {
            mode: FieldMode::Set,
            text_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn append_text(value: impl Into<String>) -> Self {
        Self {
            mode: FieldMode::Append,
            text_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn replace_text(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            mode: FieldMode::Replace,
            text_value: Some(search.into()),
            replace_with: Some(replacement.into()),
            ..Self::default()
        }
    }

    pub fn set_boolean(value: bool) -> Self {
        Self {
            mode: FieldMode::Set,
            boolean_value: Some(value),
            ..Self::default()
        }
    }

    pub fn set_reference(id: ReferenceId) -> Self {
        Self {
            mode: FieldMode::Set,
            reference_id: Some(id),
            ..Self::default()
        }
    }

    pub fn append_reference(id: ReferenceId) -> Self {
        Self {
            mode: FieldMode::Append,
            reference_id: Some(id),
            append: true,
            ..Self::default()
        }
    }

    pub fn delete_reference(id: ReferenceId) -> Self {
        Self {
            mode: FieldMode::Delete,
            reference_id: Some(id),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            mode: FieldMode::Delete,
            ..Self::default()
        }
    }
}

/// A named mapping of field id to requested operation for one batch request.
///
/// Built fresh per request from client input, never persisted, discarded
/// after the batch commits. Keys are unique; insertion order is irrelevant
/// (application order follows the entity schema's declaration order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationPlan {
    entries: BTreeMap<String, FieldOperation>,
}

impl OperationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field_id: impl Into<String>, op: FieldOperation) -> Self {
        self.entries.insert(field_id.into(), op);
        self
    }

    pub fn insert(&mut self, field_id: impl Into<String>, op: FieldOperation) {
        self.entries.insert(field_id.into(), op);
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldOperation> {
        self.entries.get(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOperation)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
