//! # List Sync Module
//!
//! Keeps canonical playlists and collections in step with the lists held by
//! remote media clients.
//!
//! ## Overview
//!
//! This module manages:
//! - Resolving a client id to a list provider, gated on the client's
//!   playlist/collection capability
//! - Pushing a canonical list to one client or to every bound client
//! - Pulling a remote list into the canonical store, binding or creating the
//!   local list
//! - Local edits (add, remove, reorder) with dense positions
//!
//! ## Components
//!
//! - **Client Resolver** (`resolver`): Client lookup and capability checks
//! - **List Sync Service** (`service`): Push, pull and local list operations

pub mod error;
pub mod resolver;
pub mod service;

pub use error::{Result, SyncError};
pub use resolver::{ClientResolver, ResolvedClient};
pub use service::{ListSyncConfig, ListSyncService};
