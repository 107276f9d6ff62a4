use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field_value::FieldValue;
use crate::operation::{FieldMode, OperationPlan};

/// The declared type of a field, which fixes its capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Boolean { default: bool },
    Enum { default: String },
    Reference,
    ReferenceList,
}

impl FieldKind {
    /// Whether this kind supports the given mode.
    ///
    /// Free text supports all four; boolean, enum and single-reference
    /// support only SET/DELETE; reference lists support only APPEND/DELETE —
    /// wholesale replacement of a list is not a supported mode, so a partial
    /// bulk edit can never drop unrelated existing members.
    pub fn supports(&self, mode: FieldMode) -> bool {
        match self {
            Self::Text => matches!(
                mode,
                FieldMode::Set | FieldMode::Append | FieldMode::Delete | FieldMode::Replace
            ),
            Self::Boolean { .. } | Self::Enum { .. } | Self::Reference => {
                matches!(mode, FieldMode::Set | FieldMode::Delete)
            }
            Self::ReferenceList => matches!(mode, FieldMode::Append | FieldMode::Delete),
        }
    }

    /// The value DELETE resets to. Text and single references clear to Null;
    /// boolean and enum fields restore their documented default.
    pub fn delete_value(&self) -> FieldValue {
        match self {
            Self::Text | Self::Reference => FieldValue::Null,
            Self::Boolean { default } => FieldValue::Boolean(*default),
            Self::Enum { default } => FieldValue::Enum(default.clone()),
            Self::ReferenceList => FieldValue::References(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Boolean { .. } => "boolean",
            Self::Enum { .. } => "enum",
            Self::Reference => "reference",
            Self::ReferenceList => "reference-list",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field_id: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(field_id: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            field_id: field_id.into(),
            kind,
        }
    }
}

/// Per-entity-type field declarations, in declaration order.
///
/// The declaration order drives the order in which active operations are
/// applied to each record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    pub fields: Vec<FieldSpec>,
}

impl EntitySchema {
    pub fn new(entity_type: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields,
        }
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }

    /// Reject plan entries whose mode the declared field kind does not
    /// support. This is a configuration error caught before execution, not a
    /// data-model concern; fields the schema no longer knows are left for
    /// the apply step to skip with a warning.
    pub fn validate_plan(&self, plan: &OperationPlan) -> Result<(), CoreError> {
        for (field_id, op) in plan.iter() {
            if op.mode == FieldMode::None {
                continue;
            }
            if let Some(spec) = self.field(field_id)
                && !spec.kind.supports(op.mode)
            {
                return Err(CoreError::UnsupportedMode {
                    field_id: field_id.to_string(),
                    mode: op.mode.name(),
                    kind: spec.kind.name(),
                });
            }
        }
        Ok(())
    }
}
