use massedit_core::{EntitySchema, FieldKind, FieldMode, FieldOperation, FieldSpec, OperationPlan};

use crate::adapter::EntityAdapter;

/// Generic per-kind activity rule: does this operation actually change data?
///
/// An operation is inactive when its mode is `None` or when the payload slot
/// the field's kind requires is unset. `Set` with an empty string on a text
/// field is active: set-to-empty is meaningful and distinct from `Delete`.
/// List appends additionally require the explicit `append` opt-in flag, since
/// the same id slot also backs `Delete`.
pub fn is_active(spec: &FieldSpec, op: &FieldOperation) -> bool {
    match op.mode {
        FieldMode::None => false,
        FieldMode::Set => match &spec.kind {
            FieldKind::Text | FieldKind::Enum { .. } => op.text_value.is_some(),
            FieldKind::Boolean { .. } => op.boolean_value.is_some(),
            FieldKind::Reference => op.reference_id.is_some(),
            FieldKind::ReferenceList => false,
        },
        FieldMode::Append => match &spec.kind {
            FieldKind::Text => op.text_value.is_some(),
            FieldKind::ReferenceList => op.append && op.reference_id.is_some(),
            _ => false,
        },
        FieldMode::Delete => match &spec.kind {
            // Deleting from a list means removing one member by id.
            FieldKind::ReferenceList => op.reference_id.is_some(),
            _ => true,
        },
        FieldMode::Replace => {
            matches!(spec.kind, FieldKind::Text)
                && op.text_value.as_deref().is_some_and(|s| !s.is_empty())
                && op.replace_with.is_some()
        }
    }
}

/// The gate's verdict on one whole plan.
pub struct PlanAnalysis {
    /// Schema fields with an active operation, in declaration order.
    pub active: Vec<FieldSpec>,
    /// Fields the adapter declared active itself (side-table specials etc.);
    /// these bypass the modifier registry and are left to post-commit hooks.
    pub special: Vec<String>,
    /// Plan entries no schema field matches (removed since the form was
    /// rendered); skipped with a warning, never fatal.
    pub unknown: Vec<String>,
}

impl PlanAnalysis {
    pub fn has_active(&self) -> bool {
        !self.active.is_empty() || !self.special.is_empty()
    }
}

/// Run every plan entry through the adapter override, then the generic rule.
pub fn analyze<A: EntityAdapter + ?Sized>(
    schema: &EntitySchema,
    plan: &OperationPlan,
    adapter: &A,
) -> PlanAnalysis {
    let mut special = Vec::new();
    let mut unknown = Vec::new();
    let mut active_ids = Vec::new();

    for (field_id, op) in plan.iter() {
        match adapter.is_field_active(field_id, plan) {
            Some(true) => {
                if schema.field(field_id).is_some() {
                    active_ids.push(field_id.to_string());
                } else {
                    special.push(field_id.to_string());
                }
            }
            Some(false) => {}
            None => match schema.field(field_id) {
                Some(spec) => {
                    if is_active(spec, op) {
                        active_ids.push(field_id.to_string());
                    }
                }
                None => unknown.push(field_id.to_string()),
            },
        }
    }

    // Declaration order drives application order, not plan key order.
    let active = schema
        .fields
        .iter()
        .filter(|spec| active_ids.iter().any(|id| *id == spec.field_id))
        .cloned()
        .collect();

    PlanAnalysis {
        active,
        special,
        unknown,
    }
}
