pub mod adapter;
pub mod batch;
pub mod error;
pub mod gate;
pub mod modifier;
pub mod project;
pub mod tail;

pub use adapter::EntityAdapter;
pub use batch::{run_batch, BatchOutcome, BatchWarning, IdentityRow};
pub use error::{EngineError, PersistError};
pub use modifier::{ModifierConfig, ModifierRegistry, ReplaceStyle};
pub use project::{project, ExportTable};
pub use tail::{AuditBus, AuditEvent, LogSubscription, SourceMatcher, DEFAULT_TAIL_CAPACITY};
