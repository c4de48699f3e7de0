//! Error types for the Jellyfin provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Jellyfin provider errors
#[derive(Error, Debug)]
pub enum JellyfinError {
    /// API key rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Jellyfin API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Jellyfin resource not found: {resource}")]
    NotFound { resource: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Invalid Jellyfin configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Jellyfin operations
pub type Result<T> = std::result::Result<T, JellyfinError>;

impl From<JellyfinError> for BridgeError {
    fn from(error: JellyfinError) -> Self {
        match error {
            JellyfinError::NotFound { resource } => BridgeError::NotFound(resource),
            JellyfinError::InvalidConfig(msg) => {
                BridgeError::NotAvailable(format!("Jellyfin client misconfigured: {}", msg))
            }
            JellyfinError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = JellyfinError::ApiError {
            status_code: 500,
            message: "Internal Server Error".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Jellyfin API error (status 500): Internal Server Error"
        );
    }

    #[test]
    fn test_error_conversion() {
        let auth: BridgeError = JellyfinError::AuthenticationFailed("401".to_string()).into();
        assert!(matches!(auth, BridgeError::OperationFailed(_)));

        let missing: BridgeError = JellyfinError::NotFound {
            resource: "playlist abc".to_string(),
        }
        .into();
        assert!(matches!(missing, BridgeError::NotFound(ref r) if r == "playlist abc"));
    }
}
