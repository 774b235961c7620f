use api::ApiError;
use storage::StorageError;

/// Failure of a tracker operation.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The tracker actor is gone or dropped the reply.
    #[error("tracker unavailable: {0}")]
    Unavailable(String),
}
