//! Domain models for canonical lists
//!
//! An [`ItemList`] is the system-of-record copy of a playlist or collection.
//! It carries its items in play order, an audit trail per item, and one
//! [`SyncState`] per remote client it has been bound to.

use crate::error::{LibraryError, Result};
use crate::history::HistoryRetention;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a canonical list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListId(pub Uuid);

impl ListId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| LibraryError::InvalidInput {
                field: "list_id".to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for ListId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Value as stored in SQLite (INTEGER is signed 64-bit).
            pub(crate) fn as_db(self) -> i64 {
                self.0 as i64
            }

            pub(crate) fn from_db(value: i64) -> Self {
                Self(value as u64)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of the user owning a list
    UserId
);
numeric_id!(
    /// Identifier of a configured remote client
    ClientId
);
numeric_id!(
    /// Canonical media item reference. Owned elsewhere; lists only carry it.
    ItemId
);

// =============================================================================
// Enums
// =============================================================================

/// Which remote API shape a list maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Playlist,
    Collection,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Playlist => "playlist",
            ListKind::Collection => "collection",
        }
    }
}

impl FromStr for ListKind {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "playlist" => Ok(ListKind::Playlist),
            "collection" => Ok(ListKind::Collection),
            _ => Err(LibraryError::InvalidInput {
                field: "kind".to_string(),
                message: format!("Unknown list kind: {}", s),
            }),
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the last sync attempt against one client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failed,
    Pending,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
            SyncStatus::Pending => "pending",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "success" => Ok(SyncStatus::Success),
            "failed" => Ok(SyncStatus::Failed),
            "pending" => Ok(SyncStatus::Pending),
            _ => Err(LibraryError::InvalidInput {
                field: "status".to_string(),
                message: format!("Unknown sync status: {}", s),
            }),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a change record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Entry written by a pull from a remote client
    Sync,
    Add,
    Remove,
    Reorder,
    Update,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Sync => "sync",
            ChangeType::Add => "add",
            ChangeType::Remove => "remove",
            ChangeType::Reorder => "reorder",
            ChangeType::Update => "update",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who caused a change.
///
/// `User` and `System` are application-level changes; `Client` marks data
/// that arrived from a remote client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Origin {
    System,
    User(UserId),
    Client(ClientId),
}

impl Origin {
    pub fn is_application(&self) -> bool {
        !matches!(self, Origin::Client(_))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::System => write!(f, "system"),
            Origin::User(id) => write!(f, "user:{}", id),
            Origin::Client(id) => write!(f, "client:{}", id),
        }
    }
}

impl FromStr for Origin {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LibraryError::InvalidInput {
            field: "origin".to_string(),
            message: format!("Invalid origin: {}", s),
        };

        if s == "system" {
            return Ok(Origin::System);
        }

        let (kind, id) = s.split_once(':').ok_or_else(invalid)?;
        let id: u64 = id.parse().map_err(|_| invalid())?;
        match kind {
            "user" => Ok(Origin::User(UserId(id))),
            "client" => Ok(Origin::Client(ClientId(id))),
            _ => Err(invalid()),
        }
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// Immutable audit entry attached to a list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub origin: Origin,
    /// Cross-system identifier of the item this change refers to
    pub item_id: String,
    pub change_type: ChangeType,
    pub timestamp: DateTime<Utc>,
}

impl ChangeRecord {
    pub fn new(
        origin: Origin,
        item_id: impl Into<String>,
        change_type: ChangeType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            origin,
            item_id: item_id.into(),
            change_type,
            timestamp,
        }
    }
}

/// One entry in a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub item_id: ItemId,
    /// Zero-based; dense across the list once normalized
    pub position: u32,
    pub last_changed: DateTime<Utc>,
    /// Append-only audit trail, oldest first
    pub change_history: Vec<ChangeRecord>,
}

impl ListItem {
    pub fn new(item_id: ItemId, position: u32, at: DateTime<Utc>) -> Self {
        Self {
            item_id,
            position,
            last_changed: at,
            change_history: Vec::new(),
        }
    }

    /// Append a change and bump `last_changed`.
    pub fn record(&mut self, origin: Origin, change_type: ChangeType, at: DateTime<Utc>) {
        self.change_history.push(ChangeRecord::new(
            origin,
            self.item_id.to_string(),
            change_type,
            at,
        ));
        self.last_changed = at;
    }
}

/// Binding between a canonical list and one remote client's copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Remote identifier of the list; empty until created remotely
    pub client_list_id: String,
    pub last_synced: Option<DateTime<Utc>>,
    pub status: SyncStatus,
}

impl SyncState {
    pub fn success(client_list_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            client_list_id: client_list_id.into(),
            last_synced: Some(at),
            status: SyncStatus::Success,
        }
    }

    /// Not yet pushed anywhere
    pub fn pending() -> Self {
        Self {
            client_list_id: String::new(),
            last_synced: None,
            status: SyncStatus::Pending,
        }
    }

    /// Whether a remote copy exists for this binding
    pub fn is_bound(&self) -> bool {
        !self.client_list_id.is_empty()
    }
}

/// Canonical list aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    pub id: ListId,
    pub kind: ListKind,
    pub title: String,
    pub description: String,
    pub owner_id: UserId,
    pub is_public: bool,
    /// Items in canonical play/browse order
    pub items: Vec<ListItem>,
    /// Always `items.len()`; recomputed on every mutation
    pub item_count: u32,
    /// Per-client bindings; a missing key means never synced to that client
    pub sync_states: BTreeMap<ClientId, SyncState>,
    pub last_modified: DateTime<Utc>,
    pub modified_by: Origin,
    /// Last time any remote sync touched this list
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every update
    pub version: i64,
}

impl ItemList {
    /// Create an empty list owned by `owner_id`
    pub fn new(
        owner_id: UserId,
        kind: ListKind,
        title: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ListId::new(),
            kind,
            title: title.into(),
            description: String::new(),
            owner_id,
            is_public: false,
            items: Vec::new(),
            item_count: 0,
            sync_states: BTreeMap::new(),
            last_modified: at,
            modified_by: Origin::User(owner_id),
            last_synced: None,
            created_at: at,
            version: 0,
        }
    }

    /// Validate the at-rest invariants
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.item_count as usize != self.items.len() {
            return Err(format!(
                "item_count {} does not match {} items",
                self.item_count,
                self.items.len()
            ));
        }

        if let Some((index, item)) = self
            .items
            .iter()
            .enumerate()
            .find(|(index, item)| item.position as usize != *index)
        {
            return Err(format!(
                "item {} at index {} has position {}",
                item.item_id, index, item.position
            ));
        }

        Ok(())
    }

    /// Record a local mutation
    pub fn touch(&mut self, by: Origin, at: DateTime<Utc>) {
        self.modified_by = by;
        self.last_modified = at;
    }

    /// Rewrite positions to `0..n-1` in current stored order and recompute
    /// `item_count`.
    pub fn normalize_positions(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.position = index as u32;
        }
        self.item_count = self.items.len() as u32;
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.item_id).collect()
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.items.iter().any(|item| item.item_id == item_id)
    }

    /// Append an item at the end of the list
    pub fn add_item(&mut self, item_id: ItemId, origin: Origin, at: DateTime<Utc>) {
        let mut item = ListItem::new(item_id, self.items.len() as u32, at);
        item.record(origin, ChangeType::Add, at);
        self.items.push(item);
        self.normalize_positions();
        self.touch(origin, at);
    }

    /// Remove every entry referring to `item_id`. Returns whether anything
    /// was removed.
    pub fn remove_item(&mut self, item_id: ItemId, origin: Origin, at: DateTime<Utc>) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.item_id != item_id);
        let removed = self.items.len() != before;

        if removed {
            self.normalize_positions();
            self.touch(origin, at);
        }

        removed
    }

    /// Rebuild the item order from the complete list of item ids.
    ///
    /// The request must name every current entry exactly once (duplicate
    /// entries must be named as many times as they occur). On any mismatch
    /// the list is left untouched.
    ///
    /// # Errors
    ///
    /// `LibraryError::InvalidInput` when the count differs or an id is not in
    /// the list.
    pub fn reorder(&mut self, ordered: &[ItemId], origin: Origin, at: DateTime<Utc>) -> Result<()> {
        if ordered.len() != self.items.len() {
            return Err(LibraryError::InvalidInput {
                field: "item_ids".to_string(),
                message: format!(
                    "expected {} item ids, got {}",
                    self.items.len(),
                    ordered.len()
                ),
            });
        }

        let mut pool: HashMap<ItemId, VecDeque<ListItem>> = HashMap::new();
        for item in &self.items {
            pool.entry(item.item_id).or_default().push_back(item.clone());
        }

        let mut reordered = Vec::with_capacity(ordered.len());
        for item_id in ordered {
            let mut item = pool
                .get_mut(item_id)
                .and_then(VecDeque::pop_front)
                .ok_or_else(|| LibraryError::InvalidInput {
                    field: "item_ids".to_string(),
                    message: format!("item {} is not in list {}", item_id, self.id),
                })?;
            item.record(origin, ChangeType::Reorder, at);
            reordered.push(item);
        }

        self.items = reordered;
        self.normalize_positions();
        self.touch(origin, at);
        Ok(())
    }

    /// Replace all items with the given remote order.
    ///
    /// Every new entry starts with a single `Sync` change record attributed
    /// to `client_id`.
    pub fn replace_items_from_remote(
        &mut self,
        item_ids: &[ItemId],
        client_id: ClientId,
        at: DateTime<Utc>,
    ) {
        self.items = item_ids
            .iter()
            .enumerate()
            .map(|(index, item_id)| {
                let mut item = ListItem::new(*item_id, index as u32, at);
                item.record(Origin::Client(client_id), ChangeType::Sync, at);
                item
            })
            .collect();
        self.normalize_positions();
    }

    pub fn sync_state(&self, client_id: ClientId) -> Option<&SyncState> {
        self.sync_states.get(&client_id)
    }

    /// Remote list id recorded for `client_id`, if the list exists remotely
    pub fn client_list_id(&self, client_id: ClientId) -> Option<&str> {
        self.sync_state(client_id)
            .filter(|state| state.is_bound())
            .map(|state| state.client_list_id.as_str())
    }

    pub fn is_bound_to(&self, client_id: ClientId, client_list_id: &str) -> bool {
        self.client_list_id(client_id) == Some(client_list_id)
    }

    /// Record a successful push or pull against `client_id`
    pub fn record_sync(
        &mut self,
        client_id: ClientId,
        client_list_id: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        self.sync_states
            .insert(client_id, SyncState::success(client_list_id, at));
        self.last_synced = Some(at);
    }

    /// Run the retention hook over every item's change history
    pub fn apply_history_retention(&mut self, policy: &dyn HistoryRetention) {
        for item in &mut self.items {
            policy.retain(&mut item.change_history);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_secs)
    }

    fn list_with(ids: &[u64]) -> ItemList {
        let owner = UserId(1);
        let mut list = ItemList::new(owner, ListKind::Playlist, "Mix", at(0));
        for id in ids {
            list.add_item(ItemId(*id), Origin::User(owner), at(0));
        }
        list
    }

    fn ids(list: &ItemList) -> Vec<u64> {
        list.items.iter().map(|item| item.item_id.0).collect()
    }

    fn assert_positions_dense(list: &ItemList) {
        assert_eq!(list.item_count as usize, list.items.len());
        for (index, item) in list.items.iter().enumerate() {
            assert_eq!(item.position as usize, index);
        }
        assert!(list.validate().is_ok());
    }

    #[test]
    fn test_new_list_is_empty() {
        let list = ItemList::new(UserId(7), ListKind::Collection, "Westerns", at(0));

        assert_eq!(list.item_count, 0);
        assert!(list.items.is_empty());
        assert!(list.sync_states.is_empty());
        assert_eq!(list.modified_by, Origin::User(UserId(7)));
        assert_eq!(list.last_synced, None);
        assert_eq!(list.version, 0);
    }

    #[test]
    fn test_add_item_appends_with_history() {
        let list = list_with(&[10, 20, 30]);

        assert_eq!(ids(&list), vec![10, 20, 30]);
        assert_positions_dense(&list);
        let history = &list.items[1].change_history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_type, ChangeType::Add);
        assert_eq!(history[0].item_id, "20");
    }

    #[test]
    fn test_remove_item_renumbers_positions() {
        let mut list = list_with(&[10, 20, 30, 20]);

        assert!(list.remove_item(ItemId(20), Origin::System, at(5)));
        assert_eq!(ids(&list), vec![10, 30]);
        assert_positions_dense(&list);
        assert_eq!(list.modified_by, Origin::System);
        assert_eq!(list.last_modified, at(5));

        assert!(!list.remove_item(ItemId(99), Origin::System, at(6)));
        assert_eq!(list.last_modified, at(5));
    }

    #[test]
    fn test_normalize_positions_closes_gaps() {
        let mut list = list_with(&[1, 2, 3]);
        list.items[0].position = 4;
        list.items[1].position = 9;
        list.items[2].position = 4;
        list.item_count = 17;
        assert!(list.validate().is_err());

        list.normalize_positions();

        assert_positions_dense(&list);
        assert_eq!(ids(&list), vec![1, 2, 3]);
    }

    #[test]
    fn test_reorder_rebuilds_order() {
        let mut list = list_with(&[1, 2, 3]);

        list.reorder(&[ItemId(3), ItemId(1), ItemId(2)], Origin::User(UserId(1)), at(10))
            .unwrap();

        assert_eq!(ids(&list), vec![3, 1, 2]);
        assert_positions_dense(&list);
        for item in &list.items {
            let last = item.change_history.last().unwrap();
            assert_eq!(last.change_type, ChangeType::Reorder);
            assert_eq!(last.timestamp, at(10));
            assert_eq!(item.last_changed, at(10));
        }
    }

    #[test]
    fn test_reorder_rejects_subset() {
        let mut list = list_with(&[1, 2, 3]);
        let before = list.clone();

        let result = list.reorder(&[ItemId(1), ItemId(2)], Origin::System, at(10));

        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(list, before);
    }

    #[test]
    fn test_reorder_rejects_superset_and_unknown_ids() {
        let mut list = list_with(&[1, 2, 3]);
        let before = list.clone();

        assert!(list
            .reorder(&[ItemId(1), ItemId(2), ItemId(3), ItemId(4)], Origin::System, at(1))
            .is_err());
        assert!(list
            .reorder(&[ItemId(1), ItemId(2), ItemId(4)], Origin::System, at(1))
            .is_err());
        assert_eq!(list, before);
    }

    #[test]
    fn test_reorder_with_duplicates_requires_exact_multiset() {
        let mut list = list_with(&[1, 1, 2]);

        assert!(list
            .reorder(&[ItemId(1), ItemId(2), ItemId(2)], Origin::System, at(1))
            .is_err());
        list.reorder(&[ItemId(2), ItemId(1), ItemId(1)], Origin::System, at(1))
            .unwrap();
        assert_eq!(ids(&list), vec![2, 1, 1]);
    }

    #[test]
    fn test_replace_items_from_remote() {
        let mut list = list_with(&[1, 2]);

        list.replace_items_from_remote(&[ItemId(9), ItemId(8), ItemId(7)], ClientId(42), at(30));

        assert_eq!(ids(&list), vec![9, 8, 7]);
        assert_positions_dense(&list);
        for item in &list.items {
            assert_eq!(item.change_history.len(), 1);
            let record = &item.change_history[0];
            assert_eq!(record.origin, Origin::Client(ClientId(42)));
            assert_eq!(record.change_type, ChangeType::Sync);
            assert_eq!(record.timestamp, at(30));
        }
    }

    #[test]
    fn test_record_sync_binds_client() {
        let mut list = list_with(&[1]);
        assert_eq!(list.client_list_id(ClientId(42)), None);

        list.record_sync(ClientId(42), "remote-1", at(60));

        assert_eq!(list.client_list_id(ClientId(42)), Some("remote-1"));
        assert!(list.is_bound_to(ClientId(42), "remote-1"));
        assert!(!list.is_bound_to(ClientId(43), "remote-1"));
        let state = list.sync_state(ClientId(42)).unwrap();
        assert_eq!(state.status, SyncStatus::Success);
        assert_eq!(state.last_synced, Some(at(60)));
        assert_eq!(list.last_synced, Some(at(60)));
    }

    #[test]
    fn test_pending_state_is_not_bound() {
        let mut list = list_with(&[]);
        list.sync_states.insert(ClientId(5), SyncState::pending());

        assert!(list.sync_state(ClientId(5)).is_some());
        assert_eq!(list.client_list_id(ClientId(5)), None);
    }

    #[test]
    fn test_history_retention_hook_is_applied() {
        let mut list = list_with(&[1, 2]);
        list.reorder(&[ItemId(2), ItemId(1)], Origin::System, at(1)).unwrap();
        assert_eq!(list.items[0].change_history.len(), 2);

        let keep_last = |history: &mut Vec<ChangeRecord>| {
            let excess = history.len().saturating_sub(1);
            history.drain(..excess);
        };
        list.apply_history_retention(&keep_last);

        for item in &list.items {
            assert_eq!(item.change_history.len(), 1);
            assert_eq!(item.change_history[0].change_type, ChangeType::Reorder);
        }
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Playlist".parse::<ListKind>().unwrap(), ListKind::Playlist);
        assert_eq!("collection".parse::<ListKind>().unwrap(), ListKind::Collection);
        assert!("folder".parse::<ListKind>().is_err());

        assert_eq!("PENDING".parse::<SyncStatus>().unwrap(), SyncStatus::Pending);
        assert!("unknown".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_origin_round_trips_through_text() {
        for origin in [
            Origin::System,
            Origin::User(UserId(12)),
            Origin::Client(ClientId(0)),
        ] {
            assert_eq!(origin.to_string().parse::<Origin>().unwrap(), origin);
        }
        assert!("client:abc".parse::<Origin>().is_err());
        assert!("robot:1".parse::<Origin>().is_err());
        assert!(Origin::Client(ClientId(0)) != Origin::System);
        assert!(Origin::User(UserId(3)).is_application());
        assert!(!Origin::Client(ClientId(3)).is_application());
    }
}
