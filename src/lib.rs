//! # List Sync Workspace
//!
//! Umbrella crate for hosts that want the whole list sync core behind one
//! dependency. Features map onto `core-service`:
//!
//! - `desktop-shims` (default): reqwest-backed `HttpClient` as the default
//! - `jellyfin`: Jellyfin playlist client and the `jellyfin_client` helper

#[cfg(any(feature = "desktop-shims", feature = "jellyfin"))]
pub use core_service::{CoreError, CoreService, Result};

#[cfg(feature = "jellyfin")]
pub use core_service::{JellyfinClient, JellyfinConfig};
