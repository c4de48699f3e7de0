use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// The stored row changed since the caller loaded it
    #[error("Version conflict on {entity_type} {id}: expected version {expected_version}")]
    Conflict {
        entity_type: String,
        id: String,
        expected_version: i64,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
