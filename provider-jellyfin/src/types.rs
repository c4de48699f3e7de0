//! Jellyfin API request and response types
//!
//! Jellyfin uses PascalCase JSON throughout.

use serde::{Deserialize, Serialize};

/// Body of `POST /Playlists`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatePlaylistRequest {
    pub name: String,

    /// Jellyfin item ids in playlist order
    pub ids: Vec<String>,

    /// Owning Jellyfin user
    pub user_id: String,

    /// e.g. "Audio" or "Video"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    pub is_public: bool,
}

/// Response of `POST /Playlists`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaylistCreationResult {
    pub id: String,
}

/// Body of `POST /Playlists/{id}`. Replaces the whole item set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePlaylistRequest {
    pub name: String,
    pub ids: Vec<String>,
    pub is_public: bool,
}

/// Response of `GET /Playlists/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaylistDto {
    /// Visible to every user on the server
    #[serde(default)]
    pub open_access: bool,

    /// Item ids in playlist order
    #[serde(default)]
    pub item_ids: Vec<String>,
}

/// The subset of `BaseItemDto` read for playlist metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItemDto {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub overview: Option<String>,
}
