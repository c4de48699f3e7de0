use bridge_traits::error::BridgeError;
use core_library::{ClientId, LibraryError, ListKind, UserId};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("List {list_id} not found")]
    ListNotFound { list_id: String },

    #[error("Client {client_id} not found")]
    ClientNotFound { client_id: ClientId },

    #[error("Client {client_id} does not support {kind} lists")]
    UnsupportedCapability { client_id: ClientId, kind: ListKind },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Remote provider error on client {client_id}: {source}")]
    RemoteProvider {
        client_id: ClientId,
        #[source]
        source: BridgeError,
    },

    #[error("User {user_id} does not own list {list_id}")]
    PermissionDenied { user_id: UserId, list_id: String },

    #[error("List {list_id} was modified concurrently")]
    ConcurrencyConflict { list_id: String },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Library error: {0}")]
    Library(LibraryError),
}

impl SyncError {
    /// Whether repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteProvider { .. }
                | SyncError::Timeout(_)
                | SyncError::ConcurrencyConflict { .. }
        )
    }
}

impl From<LibraryError> for SyncError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Conflict { id, .. } => SyncError::ConcurrencyConflict { list_id: id },
            LibraryError::NotFound { id, .. } => SyncError::ListNotFound { list_id: id },
            LibraryError::InvalidInput { field, message } => {
                SyncError::Validation(format!("{}: {}", field, message))
            }
            other => SyncError::Library(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
