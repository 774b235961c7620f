//! Validation errors raised at the network and storage boundaries.

/// A response or document that does not match the expected schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}
