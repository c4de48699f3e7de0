//! Remote Media Client Abstractions
//!
//! A `MediaClient` is a handle to one configured external system (media
//! server, download manager). Not every client can hold lists: automation
//! managers never do, and media servers may have the feature switched off.
//! Capability queries must be answered before any provider call is made.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{BridgeError, Result};
use crate::lists::ListProvider;

/// Kind of external system behind a client id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Jellyfin,
    Emby,
    Plex,
    Subsonic,
    Radarr,
    Sonarr,
    Lidarr,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Jellyfin => "jellyfin",
            ClientType::Emby => "emby",
            ClientType::Plex => "plex",
            ClientType::Subsonic => "subsonic",
            ClientType::Radarr => "radarr",
            ClientType::Sonarr => "sonarr",
            ClientType::Lidarr => "lidarr",
        }
    }

    /// Media servers hold user-facing lists; automation managers do not.
    pub fn is_media_server(&self) -> bool {
        matches!(
            self,
            ClientType::Jellyfin | ClientType::Emby | ClientType::Plex | ClientType::Subsonic
        )
    }
}

impl FromStr for ClientType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jellyfin" => Ok(ClientType::Jellyfin),
            "emby" => Ok(ClientType::Emby),
            "plex" => Ok(ClientType::Plex),
            "subsonic" => Ok(ClientType::Subsonic),
            "radarr" => Ok(ClientType::Radarr),
            "sonarr" => Ok(ClientType::Sonarr),
            "lidarr" => Ok(ClientType::Lidarr),
            other => Err(BridgeError::NotAvailable(format!(
                "Unknown client type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle to a configured remote client.
///
/// The default implementations describe a client with no list support at
/// all; media servers override the pairs they implement.
pub trait MediaClient: Send + Sync {
    /// Opaque id this client is registered under
    fn client_id(&self) -> u64;

    fn client_type(&self) -> ClientType;

    fn supports_playlists(&self) -> bool {
        false
    }

    fn supports_collections(&self) -> bool {
        false
    }

    /// # Errors
    ///
    /// `BridgeError::NotAvailable` when the client has no playlist API.
    fn playlist_provider(&self) -> Result<Arc<dyn ListProvider>> {
        Err(BridgeError::NotAvailable(format!(
            "{} client does not provide playlists",
            self.client_type()
        )))
    }

    /// # Errors
    ///
    /// `BridgeError::NotAvailable` when the client has no collection API.
    fn collection_provider(&self) -> Result<Arc<dyn ListProvider>> {
        Err(BridgeError::NotAvailable(format!(
            "{} client does not provide collections",
            self.client_type()
        )))
    }
}

/// Builds client handles from stored client configuration.
///
/// Implemented by the host: it owns client credentials and connection
/// settings.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Look up a client by id. `Ok(None)` means no such client is configured.
    async fn get_client(&self, client_id: u64) -> Result<Option<Arc<dyn MediaClient>>>;
}
