use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::error::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
