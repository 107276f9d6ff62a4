use massedit_core::{CoreError, RecordId};
use thiserror::Error;

use crate::batch::BatchOutcome;

/// A failure reported by the persistence collaborator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PersistError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn from_source(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("plan has no active operations")]
    PlanInvalid,

    #[error("selection could not be resolved: {0}")]
    Resolve(PersistError),

    /// Fatal to the remainder of the batch; `partial` carries the count and
    /// identities of records already committed. Prior commits stay applied.
    #[error("persist failed on record {record_id}: {source}")]
    Persist {
        record_id: RecordId,
        source: PersistError,
        partial: BatchOutcome,
    },

    #[error("export row for record {record_id} has {got} columns, header has {expected}")]
    ExportShape {
        record_id: RecordId,
        expected: usize,
        got: usize,
    },
}
