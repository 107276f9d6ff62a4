use serde::Serialize;
use tracing::{debug, warn};

use massedit_core::{BatchId, OperationPlan, Record, RecordId};

use crate::adapter::EntityAdapter;
use crate::error::EngineError;
use crate::gate;
use crate::modifier::{ModifierConfig, ModifierRegistry};

/// One committed record's identity summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRow {
    pub label: String,
    pub record_id: RecordId,
}

/// Locally-recovered problems surfaced alongside the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchWarning {
    /// A plan field no schema field matches (removed since the form was
    /// rendered); the operation was skipped.
    UnknownField { field_id: String },
    /// A post-commit hook failed after the record was already persisted; the
    /// primary update stands.
    PostCommit { record_id: RecordId, message: String },
}

/// What one batch invocation accomplished.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub batch_id: Option<BatchId>,
    /// Records actually persisted.
    pub touched: usize,
    /// Selected ids that resolved to no live, accessible record.
    pub skipped: usize,
    pub rows: Vec<IdentityRow>,
    pub warnings: Vec<BatchWarning>,
}

/// Per-batch mutable state owned by the commit loop, discarded when the
/// loop finishes.
struct ApplyContext {
    batch_id: BatchId,
    rows: Vec<IdentityRow>,
    skipped: usize,
    warnings: Vec<BatchWarning>,
}

impl ApplyContext {
    fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            rows: Vec::new(),
            skipped: 0,
            warnings: Vec::new(),
        }
    }

    fn into_outcome(self) -> BatchOutcome {
        BatchOutcome {
            batch_id: Some(self.batch_id),
            touched: self.rows.len(),
            skipped: self.skipped,
            rows: self.rows,
            warnings: self.warnings,
        }
    }
}

/// Drive one batch: validate the plan, gate the operations, then load,
/// apply, persist and record each selected record in turn.
///
/// Records are processed strictly sequentially. Each record commits
/// independently; a persist failure aborts the remainder of the batch and
/// reports the identities already committed, with no rollback of prior
/// commits. The loop runs to completion or to that first persist failure —
/// there is no mid-batch cancellation.
pub fn run_batch<A: EntityAdapter + ?Sized>(
    adapter: &mut A,
    selection: &[RecordId],
    plan: &OperationPlan,
    config: ModifierConfig,
) -> Result<BatchOutcome, EngineError> {
    let schema = adapter.schema().clone();

    // Configuration errors (unsupported mode for a field's kind) fail the
    // whole request before anything is gated or loaded.
    schema.validate_plan(plan)?;

    let analysis = gate::analyze(&schema, plan, adapter);
    if !analysis.has_active() {
        // Nothing would change: fail fast, nothing written, nothing logged.
        return Err(EngineError::PlanInvalid);
    }

    let batch_id = BatchId::new();
    let mut ctx = ApplyContext::new(batch_id);

    for field_id in &analysis.unknown {
        warn!(batch = %batch_id, field = %field_id, "skipping operation on unknown field");
        ctx.warnings.push(BatchWarning::UnknownField {
            field_id: field_id.clone(),
        });
    }

    let ids = dedupe(selection);
    if ids.is_empty() {
        // Empty selection is a no-op outcome, not an error.
        return Ok(ctx.into_outcome());
    }

    let records = adapter
        .resolve_selection(&ids)
        .map_err(EngineError::Resolve)?;
    ctx.skipped = ids.len() - records.len();
    if ctx.skipped > 0 {
        debug!(
            batch = %batch_id,
            skipped = ctx.skipped,
            "selection contained missing or inaccessible records"
        );
    }

    let registry = ModifierRegistry::for_schema(&schema, config);

    for mut record in records {
        let record_id = record.record_id;

        for spec in &analysis.active {
            // Plan entries were gated against this schema, so the lookup
            // cannot miss; analysis.active preserves declaration order.
            if let Some(op) = plan.get(&spec.field_id) {
                registry.apply(&spec.field_id, op, &mut record);
            }
        }

        if let Err(source) = adapter.update(&record) {
            warn!(batch = %batch_id, record = %record_id, error = %source, "persist failed, aborting batch");
            return Err(EngineError::Persist {
                record_id,
                source,
                partial: ctx.into_outcome(),
            });
        }

        if let Err(e) = adapter.post_commit_hook(&record, plan) {
            warn!(batch = %batch_id, record = %record_id, error = %e, "post-commit hook failed");
            ctx.warnings.push(BatchWarning::PostCommit {
                record_id,
                message: e.to_string(),
            });
        }

        debug!(batch = %batch_id, record = %record_id, "record committed");
        ctx.rows.push(IdentityRow {
            label: adapter.identity_label(&record),
            record_id,
        });
    }

    Ok(ctx.into_outcome())
}

/// Order-preserving dedup of the selected ids.
fn dedupe(ids: &[RecordId]) -> Vec<RecordId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistError;
    use massedit_core::{
        EntitySchema, FieldKind, FieldOperation, FieldSpec, FieldValue, OperationPlan,
    };
    use std::collections::BTreeMap;

    /// In-memory adapter: records keyed by id, optional forbidden set, and a
    /// record id that fails on persist.
    struct MemAdapter {
        schema: EntitySchema,
        records: BTreeMap<RecordId, Record>,
        forbidden: Vec<RecordId>,
        fail_on: Option<RecordId>,
        updates: Vec<RecordId>,
        hook_fails: bool,
    }

    impl MemAdapter {
        fn new() -> Self {
            Self {
                schema: EntitySchema::new(
                    "Test",
                    vec![
                        FieldSpec::new("name", FieldKind::Text),
                        FieldSpec::new(
                            "status",
                            FieldKind::Enum {
                                default: "ACTIVE".into(),
                            },
                        ),
                        FieldSpec::new("tags", FieldKind::ReferenceList),
                    ],
                ),
                records: BTreeMap::new(),
                forbidden: Vec::new(),
                fail_on: None,
                updates: Vec::new(),
                hook_fails: false,
            }
        }

        fn seed(&mut self, name: &str) -> RecordId {
            let id = RecordId::new();
            let record = Record::new(id, "Test").with_field("name", FieldValue::Text(name.into()));
            self.records.insert(id, record);
            id
        }
    }

    impl EntityAdapter for MemAdapter {
        fn schema(&self) -> &EntitySchema {
            &self.schema
        }

        fn resolve_selection(&self, ids: &[RecordId]) -> Result<Vec<Record>, PersistError> {
            Ok(ids
                .iter()
                .filter(|id| !self.forbidden.contains(id))
                .filter_map(|id| self.records.get(id).cloned())
                .collect())
        }

        fn update(&mut self, record: &Record) -> Result<(), PersistError> {
            if self.fail_on == Some(record.record_id) {
                return Err(PersistError::new("store unavailable"));
            }
            self.updates.push(record.record_id);
            self.records.insert(record.record_id, record.clone());
            Ok(())
        }

        fn identity_label(&self, record: &Record) -> String {
            record.display("name")
        }

        fn export_header(&self) -> Vec<String> {
            vec!["Name".into()]
        }

        fn export_row(&self, record: &Record) -> Vec<String> {
            vec![record.display("name")]
        }

        fn post_commit_hook(
            &mut self,
            record: &Record,
            _plan: &OperationPlan,
        ) -> Result<(), PersistError> {
            if self.hook_fails {
                return Err(PersistError::new(format!(
                    "side table rejected {}",
                    record.record_id
                )));
            }
            Ok(())
        }
    }

    fn set_status_plan() -> OperationPlan {
        OperationPlan::new().with("status", FieldOperation::set_text("ACTIVE"))
    }

    #[test]
    fn zero_active_operations_never_calls_update() {
        let mut adapter = MemAdapter::new();
        let id = adapter.seed("a");
        let plan = OperationPlan::new().with("name", FieldOperation::default());

        let err = run_batch(&mut adapter, &[id], &plan, ModifierConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::PlanInvalid));
        assert!(adapter.updates.is_empty());
    }

    #[test]
    fn empty_selection_is_a_noop_outcome() {
        let mut adapter = MemAdapter::new();
        let outcome =
            run_batch(&mut adapter, &[], &set_status_plan(), ModifierConfig::default()).unwrap();
        assert_eq!(outcome.touched, 0);
        assert!(outcome.rows.is_empty());
        assert!(adapter.updates.is_empty());
    }

    #[test]
    fn forbidden_record_is_skipped_not_fatal() {
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");
        let b = adapter.seed("b");
        let c = adapter.seed("c");
        adapter.forbidden.push(b);

        let outcome = run_batch(
            &mut adapter,
            &[a, b, c],
            &set_status_plan(),
            ModifierConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome.touched, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(
            adapter.records[&a].value("status"),
            FieldValue::Enum("ACTIVE".into())
        );
        assert_eq!(adapter.records[&b].value("status"), FieldValue::Null);
        assert_eq!(
            adapter.records[&c].value("status"),
            FieldValue::Enum("ACTIVE".into())
        );
    }

    #[test]
    fn m_of_n_resolvable_commits_exactly_m() {
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");
        let b = adapter.seed("b");
        let ghost = RecordId::new();
        let ghost2 = RecordId::new();

        let outcome = run_batch(
            &mut adapter,
            &[a, ghost, b, ghost2],
            &set_status_plan(),
            ModifierConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome.touched, 2);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.rows.len(), 2);
    }

    #[test]
    fn duplicate_ids_commit_once() {
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");

        let outcome = run_batch(
            &mut adapter,
            &[a, a, a],
            &set_status_plan(),
            ModifierConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome.touched, 1);
        assert_eq!(adapter.updates.len(), 1);
    }

    #[test]
    fn persist_failure_reports_prior_successes_and_stops() {
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");
        let b = adapter.seed("b");
        let c = adapter.seed("c");
        adapter.fail_on = Some(b);

        let err = run_batch(
            &mut adapter,
            &[a, b, c],
            &set_status_plan(),
            ModifierConfig::default(),
        )
        .unwrap_err();

        match err {
            EngineError::Persist {
                record_id, partial, ..
            } => {
                assert_eq!(record_id, b);
                assert_eq!(partial.touched, 1);
                assert_eq!(partial.rows[0].record_id, a);
            }
            other => panic!("expected Persist, got {other:?}"),
        }
        // Record c was never attempted.
        assert_eq!(adapter.updates, vec![a]);
    }

    #[test]
    fn unknown_plan_field_warns_and_continues() {
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");
        let plan = set_status_plan().with("ghost", FieldOperation::set_text("x"));

        let outcome = run_batch(&mut adapter, &[a], &plan, ModifierConfig::default()).unwrap();
        assert_eq!(outcome.touched, 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, BatchWarning::UnknownField { field_id } if field_id == "ghost")));
    }

    #[test]
    fn only_unknown_fields_means_plan_invalid() {
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");
        let plan = OperationPlan::new().with("ghost", FieldOperation::set_text("x"));

        let err = run_batch(&mut adapter, &[a], &plan, ModifierConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::PlanInvalid));
    }

    #[test]
    fn hook_failure_is_a_warning_not_a_revert() {
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");
        adapter.hook_fails = true;

        let outcome =
            run_batch(&mut adapter, &[a], &set_status_plan(), ModifierConfig::default()).unwrap();

        assert_eq!(outcome.touched, 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, BatchWarning::PostCommit { record_id, .. } if *record_id == a)));
        // Primary update persisted despite the hook failure.
        assert_eq!(
            adapter.records[&a].value("status"),
            FieldValue::Enum("ACTIVE".into())
        );
    }

    #[test]
    fn operations_apply_in_declaration_order() {
        // "name" is declared before "status"; the plan's key order differs.
        let mut adapter = MemAdapter::new();
        let a = adapter.seed("a");
        let plan = OperationPlan::new()
            .with("status", FieldOperation::set_text("CLOSED"))
            .with("name", FieldOperation::set_text("renamed"));

        let outcome = run_batch(&mut adapter, &[a], &plan, ModifierConfig::default()).unwrap();
        assert_eq!(outcome.rows[0].label, "renamed");
        assert_eq!(
            adapter.records[&a].value("status"),
            FieldValue::Enum("CLOSED".into())
        );
    }
}
