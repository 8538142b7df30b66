use thiserror::Error;

/// Schema and programming errors. None of these are retryable: they mean
/// the descriptor tables disagree with the data or with each other.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("nil resource passed to diff (desired: {desired}, actual: {actual})")]
    NilResource {
        desired: &'static str,
        actual: &'static str,
    },

    #[error("diff on field {field} has no resulting operation")]
    UntaggedDiff { field: String },

    #[error("no such operation with name: {0}")]
    UnknownOperation(String),
}
