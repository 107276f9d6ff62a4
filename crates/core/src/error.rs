use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("field {field_id} ({kind}) does not support {mode}")]
    UnsupportedMode {
        field_id: String,
        mode: &'static str,
        kind: &'static str,
    },

    #[error("invalid data: {0}")]
    InvalidData(String),
}
