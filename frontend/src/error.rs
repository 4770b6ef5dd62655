use shared::{CodecError, ValidationError};
use thiserror::Error;

use crate::controller::Operation;
use crate::store::StoreError;

/// Errors handed back to the UI layer.
///
/// None of them is fatal: local state is left as it was and the user may retry.
#[derive(Debug, Error)]
pub enum TodoError {
    #[error("{operation} failed: {source}")]
    RemoteCallFailed {
        operation: Operation,
        source: StoreError,
    },
    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),
    #[error(transparent)]
    CodecFormat(#[from] CodecError),
}
