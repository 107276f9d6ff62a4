use std::collections::BTreeMap;

use massedit_core::{EntitySchema, FieldKind, FieldMode, FieldOperation, FieldValue, Record};

/// Whether `Replace` substitutes every occurrence or only the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceStyle {
    #[default]
    AllOccurrences,
    FirstOccurrence,
}

#[derive(Debug, Clone)]
pub struct ModifierConfig {
    /// Separator inserted between the existing value and appended text.
    pub append_separator: String,
    pub replace_style: ReplaceStyle,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            append_separator: "\n".into(),
            replace_style: ReplaceStyle::default(),
        }
    }
}

/// Pure transformation for one field kind: `(config, kind, operation,
/// current value) -> new value`. Never fails; no-op cases (deleting an
/// already-empty field, removing an absent member) return the input shape
/// unchanged in meaning.
type ModifierFn = fn(&ModifierConfig, &FieldKind, &FieldOperation, FieldValue) -> FieldValue;

/// Typed dispatch table built once per entity type: field id to the modifier
/// for its declared kind. Replaces the source's reflection-style dispatch on
/// field-name strings.
pub struct ModifierRegistry {
    config: ModifierConfig,
    entries: BTreeMap<String, (FieldKind, ModifierFn)>,
}

impl ModifierRegistry {
    pub fn for_schema(schema: &EntitySchema, config: ModifierConfig) -> Self {
        let mut entries = BTreeMap::new();
        for spec in &schema.fields {
            let f: ModifierFn = match spec.kind {
                FieldKind::Text => apply_text,
                FieldKind::Boolean { .. } => apply_boolean,
                FieldKind::Enum { .. } => apply_enum,
                FieldKind::Reference => apply_reference,
                FieldKind::ReferenceList => apply_reference_list,
            };
            entries.insert(spec.field_id.clone(), (spec.kind.clone(), f));
        }
        Self { config, entries }
    }

    /// Apply one operation to one field of the record. Returns `false` when
    /// the field is unknown to this registry (schema drift); the caller
    /// decides how loudly to skip.
    pub fn apply(&self, field_id: &str, op: &FieldOperation, record: &mut Record) -> bool {
        let Some((kind, f)) = self.entries.get(field_id) else {
            return false;
        };
        let current = record.value(field_id);
        let next = f(&self.config, kind, op, current);
        record.set(field_id, next);
        true
    }
}

fn apply_text(
    config: &ModifierConfig,
    kind: &FieldKind,
    op: &FieldOperation,
    current: FieldValue,
) -> FieldValue {
    match op.mode {
        FieldMode::Set => match &op.text_value {
            // Overwriting with blank means "set to empty", not "delete".
            Some(v) => FieldValue::Text(v.clone()),
            None => current,
        },
        FieldMode::Delete => kind.delete_value(),
        FieldMode::Append => match &op.text_value {
            Some(v) => match current.as_text() {
                Some(existing) if !existing.is_empty() => FieldValue::Text(format!(
                    "{existing}{}{v}",
                    config.append_separator
                )),
                // Appending to an absent value behaves like Set.
                _ => FieldValue::Text(v.clone()),
            },
            None => current,
        },
        FieldMode::Replace => match (&op.text_value, &op.replace_with, current.as_text()) {
            (Some(search), Some(replacement), Some(existing)) if !search.is_empty() => {
                let replaced = match config.replace_style {
                    ReplaceStyle::AllOccurrences => existing.replace(search, replacement),
                    ReplaceStyle::FirstOccurrence => {
                        existing.replacen(search, replacement, 1)
                    }
                };
                FieldValue::Text(replaced)
            }
            _ => current,
        },
        FieldMode::None => current,
    }
}

fn apply_boolean(
    _config: &ModifierConfig,
    kind: &FieldKind,
    op: &FieldOperation,
    current: FieldValue,
) -> FieldValue {
    match op.mode {
        FieldMode::Set => match op.boolean_value {
            Some(v) => FieldValue::Boolean(v),
            None => current,
        },
        FieldMode::Delete => kind.delete_value(),
        _ => current,
    }
}

fn apply_enum(
    _config: &ModifierConfig,
    kind: &FieldKind,
    op: &FieldOperation,
    current: FieldValue,
) -> FieldValue {
    match op.mode {
        FieldMode::Set => match &op.text_value {
            Some(v) => FieldValue::Enum(v.clone()),
            None => current,
        },
        // Restores the canonical default variant, not Null.
        FieldMode::Delete => kind.delete_value(),
        _ => current,
    }
}

fn apply_reference(
    _config: &ModifierConfig,
    _kind: &FieldKind,
    op: &FieldOperation,
    current: FieldValue,
) -> FieldValue {
    match op.mode {
        FieldMode::Set => match op.reference_id {
            Some(id) => FieldValue::Reference(id),
            None => current,
        },
        FieldMode::Delete => FieldValue::Null,
        _ => current,
    }
}

fn apply_reference_list(
    _config: &ModifierConfig,
    _kind: &FieldKind,
    op: &FieldOperation,
    current: FieldValue,
) -> FieldValue {
    let mut members = match current {
        FieldValue::References(ids) => ids,
        _ => Vec::new(),
    };
    match op.mode {
        FieldMode::Append => {
            if let Some(id) = op.reference_id
                && !members.contains(&id)
            {
                members.push(id);
            }
        }
        FieldMode::Delete => {
            if let Some(id) = op.reference_id {
                members.retain(|m| *m != id);
            }
        }
        _ => {}
    }
    FieldValue::References(members)
}
