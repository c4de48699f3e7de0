//! Remote List Abstractions
//!
//! Contract a remote media client implements when it can hold playlists or
//! collections. The shapes here are plain data: the canonical list model
//! lives in `core-library` and is translated at the sync engine boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One entry of a list as exchanged with a remote client.
///
/// `item_id` is the canonical media item id. Translating it to the client's
/// own item identifiers is the provider's job (see [`ItemIdMapper`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteListItem {
    pub item_id: u64,
    pub position: u32,
}

impl RemoteListItem {
    pub fn new(item_id: u64, position: u32) -> Self {
        Self { item_id, position }
    }
}

/// Full state of a list on a remote client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteList {
    pub name: String,
    pub description: String,
    /// Entries in remote order
    pub items: Vec<RemoteListItem>,
    pub is_public: bool,
}

impl RemoteList {
    /// Canonical item ids in remote order
    pub fn item_ids(&self) -> Vec<u64> {
        self.items.iter().map(|item| item.item_id).collect()
    }
}

/// Remote list CRUD exposed by a client that supports playlists or
/// collections.
///
/// Only call these after the owning [`MediaClient`](crate::clients::MediaClient)
/// reported the capability; the resolver in `core-sync` enforces that.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::lists::{ListProvider, RemoteListItem};
///
/// async fn push(provider: &dyn ListProvider) -> Result<String> {
///     let items = vec![RemoteListItem::new(7, 0), RemoteListItem::new(9, 1)];
///     provider.create_list("Road trip", "", &items, false).await
/// }
/// ```
#[async_trait]
pub trait ListProvider: Send + Sync {
    /// Create a new remote list and return the remote identifier.
    ///
    /// Not idempotent: calling twice creates two lists.
    async fn create_list(
        &self,
        name: &str,
        description: &str,
        items: &[RemoteListItem],
        is_public: bool,
    ) -> Result<String>;

    /// Replace the remote list's metadata and its whole item set.
    async fn update_list(
        &self,
        remote_list_id: &str,
        name: &str,
        description: &str,
        items: &[RemoteListItem],
        is_public: bool,
    ) -> Result<()>;

    /// Fetch the remote list's current full state.
    async fn get_list(&self, remote_list_id: &str) -> Result<RemoteList>;
}

/// Translates canonical media item ids to and from a client's own ids.
///
/// Items that have no counterpart on the client resolve to `None`; providers
/// skip them rather than failing the whole list.
#[async_trait]
pub trait ItemIdMapper: Send + Sync {
    async fn to_client_item(&self, client_id: u64, item_id: u64) -> Result<Option<String>>;

    async fn from_client_item(&self, client_id: u64, client_item_id: &str)
        -> Result<Option<u64>>;
}
