//! Errors returned by session operations.

use thiserror::Error;
use tripline_core::{MapError, SyncError};

/// A user operation that could not be applied.
///
/// None of these affect the connection; the runtime reports them as a
/// rejected-action notice and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Message engine rejected the operation.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Map engine rejected the edit.
    #[error(transparent)]
    Map(#[from] MapError),

    /// The surface the operation targets is not mounted.
    #[error("{0} surface is not mounted")]
    NotMounted(&'static str),

    /// The operation needs a login.
    #[error("not logged in")]
    LoggedOut,
}
