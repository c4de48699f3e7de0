//! # Jellyfin Provider
//!
//! Implements `MediaClient` and a playlist `ListProvider` for the Jellyfin
//! HTTP API.
//!
//! ## Overview
//!
//! This module provides:
//! - API key authentication through the `X-Emby-Token` header
//! - Playlist create, full-replace update and read
//! - Translation between canonical item ids and Jellyfin item ids through an
//!   injected `ItemIdMapper`
//!
//! Jellyfin has no collection API that fits full-replace semantics, so the
//! client reports collections as unsupported.

pub mod client;
pub mod connector;
pub mod error;
pub mod types;

pub use client::{JellyfinClient, JellyfinPlaylistProvider};
pub use connector::{JellyfinConfig, JellyfinConnector};
pub use error::{JellyfinError, Result};
