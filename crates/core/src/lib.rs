pub mod error;
pub mod field_value;
pub mod ids;
pub mod operation;
pub mod record;
pub mod schema;

pub use error::CoreError;
pub use field_value::FieldValue;
pub use ids::*;
pub use operation::{FieldMode, FieldOperation, OperationPlan};
pub use record::Record;
pub use schema::{EntitySchema, FieldKind, FieldSpec};
