use serde::{Deserialize, Serialize};

use crate::ids::ReferenceId;

/// The value of one field on a record.
///
/// `Enum` carries the variant name as text; the set of legal variants and
/// the canonical default live on the field's `FieldKind`, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Text(String),
    Boolean(bool),
    Enum(String),
    Reference(ReferenceId),
    References(Vec<ReferenceId>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ReferenceId> {
        match self {
            FieldValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_references(&self) -> Option<&[ReferenceId]> {
        match self {
            FieldValue::References(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}
