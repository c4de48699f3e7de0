//! # Library Module
//!
//! Owns the canonical list store: playlists and collections as the system of
//! record, independent of any remote media client.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - The [`ItemList`](models::ItemList) aggregate and its mutation rules
//!   (dense positions, change history, per-client sync state)
//! - [`ListRepository`](repositories::ListRepository) with an optimistic
//!   version check on update
//! - Change history retention hooks

pub mod db;
pub mod error;
pub mod history;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use history::{HistoryRetention, KeepAll};
pub use models::{
    ChangeRecord, ChangeType, ClientId, ItemId, ItemList, ListId, ListItem, ListKind, Origin,
    SyncState, SyncStatus, UserId,
};
pub use repositories::{ListRepository, SqliteListRepository};
