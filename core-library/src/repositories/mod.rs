//! # Repository Pattern Implementation
//!
//! Traits define the storage interface; SQLite implementations use sqlx for
//! async database access.
//!
//! ## Available Repositories
//!
//! - `ListRepository` - Canonical playlists and collections with their items
//!   and per-client sync state

pub mod list;

pub use list::{ListRepository, SqliteListRepository};
