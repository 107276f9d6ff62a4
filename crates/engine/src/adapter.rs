use massedit_core::{EntitySchema, OperationPlan, Record, RecordId};

use crate::error::PersistError;

/// The per-entity-type collaborator interface the engine depends on.
///
/// One implementation exists per entity type, wiring the generic commit loop
/// to that entity's store, identity projection and special-field handling.
/// Implementations are short-lived: constructed at batch start, discarded at
/// batch end.
pub trait EntityAdapter {
    fn schema(&self) -> &EntitySchema;

    /// Resolve selected ids into live records. Missing, deleted or
    /// forbidden ids must be tolerated by omission, never by error.
    fn resolve_selection(&self, ids: &[RecordId]) -> Result<Vec<Record>, PersistError>;

    /// Persist one fully-applied record. Each call is an independent
    /// transaction; a failure aborts the remainder of the batch but never
    /// rolls back earlier calls.
    fn update(&mut self, record: &Record) -> Result<(), PersistError>;

    /// Compact human-readable label for the per-record identity summary.
    fn identity_label(&self, record: &Record) -> String;

    fn export_header(&self) -> Vec<String>;

    fn export_row(&self, record: &Record) -> Vec<String>;

    /// Override hook for special-cased fields the generic gate cannot judge
    /// (e.g. a membership field needing an id plus an explicit flag, or a
    /// side-table field absent from the schema). `None` falls back to the
    /// generic per-kind rule.
    fn is_field_active(&self, _field_id: &str, _plan: &OperationPlan) -> Option<bool> {
        None
    }

    /// Side effects outside the generic field-modifier set (e.g. a favorite
    /// flag in a side table), invoked once per record after a successful
    /// persist. Errors surface as warnings on that record's row and never
    /// revert the primary update.
    fn post_commit_hook(
        &mut self,
        _record: &Record,
        _plan: &OperationPlan,
    ) -> Result<(), PersistError> {
        Ok(())
    }
}
