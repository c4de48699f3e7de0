//! # List Sync Service
//!
//! Orchestrates pushes of canonical lists to remote clients, pulls of remote
//! lists into the canonical store, and the local list edits that keep item
//! positions dense.
//!
//! ## Workflow
//!
//! Every operation follows the same shape:
//!
//! 1. Load the canonical list (and check ownership)
//! 2. Resolve the client and its provider for the list kind
//! 3. Make the remote call, bounded by cancellation and a timeout
//! 4. Persist once, through the repository's version check
//! 5. Emit an event
//!
//! Any failure before step 4 leaves the stored list untouched. A failure in
//! step 4 caused by a concurrent writer surfaces as
//! [`SyncError::ConcurrencyConflict`].
//!
//! ## Usage
//!
//! ```ignore
//! let service = ListSyncService::new(repository, resolver, clock, event_bus, ListSyncConfig::default());
//! let cancel = CancellationToken::new();
//!
//! service.sync_to_client(&cancel, user_id, &list_id, ClientId(42)).await?;
//! let pulled = service
//!     .sync_from_client(&cancel, user_id, ClientId(42), ListKind::Playlist, "remote-7")
//!     .await?;
//! ```

use crate::error::{Result, SyncError};
use crate::resolver::ClientResolver;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{Clock, RemoteListItem};
use core_library::{
    ClientId, HistoryRetention, ItemId, ItemList, KeepAll, ListId, ListKind, ListRepository,
    Origin, SyncState, SyncStatus, UserId,
};
use core_runtime::events::{CoreEvent, EventBus, ListEvent, ListSyncEvent};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Engine settings
#[derive(Clone)]
pub struct ListSyncConfig {
    /// Upper bound for a single provider call
    pub remote_call_timeout: Duration,

    /// Applied to every list right before it is persisted
    pub history_retention: Arc<dyn HistoryRetention>,
}

impl Default for ListSyncConfig {
    fn default() -> Self {
        Self {
            remote_call_timeout: Duration::from_secs(30),
            history_retention: Arc::new(KeepAll),
        }
    }
}

impl std::fmt::Debug for ListSyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListSyncConfig")
            .field("remote_call_timeout", &self.remote_call_timeout)
            .finish_non_exhaustive()
    }
}

/// Synchronizes canonical lists with remote media clients
pub struct ListSyncService {
    repository: Arc<dyn ListRepository>,
    resolver: ClientResolver,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    config: ListSyncConfig,
}

impl ListSyncService {
    pub fn new(
        repository: Arc<dyn ListRepository>,
        resolver: ClientResolver,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        config: ListSyncConfig,
    ) -> Self {
        Self {
            repository,
            resolver,
            clock,
            event_bus,
            config,
        }
    }

    pub fn config(&self) -> &ListSyncConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Push / pull
    // ------------------------------------------------------------------------

    /// Push the canonical list to one client.
    ///
    /// Creates the remote list on first push and fully replaces it on every
    /// later push. Remote edits made since the last push are overwritten.
    ///
    /// # Errors
    ///
    /// `ListNotFound`, `PermissionDenied`, the resolver's errors,
    /// `RemoteProvider`, `Cancelled`, `Timeout`, or `ConcurrencyConflict` when
    /// the list changed while the remote call was in flight.
    #[instrument(skip(self, cancel), fields(user_id = %user_id, list_id = %list_id, client_id = %client_id))]
    pub async fn sync_to_client(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        list_id: &ListId,
        client_id: ClientId,
    ) -> Result<()> {
        let result = self.push(cancel, user_id, list_id, client_id).await;
        if let Err(e) = &result {
            self.emit_failure(Some(list_id), client_id, "push", e);
        }
        result
    }

    async fn push(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        list_id: &ListId,
        client_id: ClientId,
    ) -> Result<()> {
        let mut list = self.load_owned(user_id, list_id).await?;
        let resolved = self.resolver.resolve(client_id, list.kind).await?;
        let items = outbound_items(&list);

        let (client_list_id, created) = match list.client_list_id(client_id) {
            Some(existing) => {
                let existing = existing.to_string();
                debug!(client_list_id = %existing, "Updating remote list");
                self.remote(
                    cancel,
                    client_id,
                    resolved.provider.update_list(
                        &existing,
                        &list.title,
                        &list.description,
                        &items,
                        list.is_public,
                    ),
                )
                .await?;
                (existing, false)
            }
            None => {
                debug!("Creating remote list");
                let created_id = self
                    .remote(
                        cancel,
                        client_id,
                        resolved.provider.create_list(
                            &list.title,
                            &list.description,
                            &items,
                            list.is_public,
                        ),
                    )
                    .await?;

                if created_id.is_empty() {
                    return Err(SyncError::RemoteProvider {
                        client_id,
                        source: BridgeError::OperationFailed(
                            "provider returned an empty list id".to_string(),
                        ),
                    });
                }
                (created_id, true)
            }
        };

        list.record_sync(client_id, client_list_id.clone(), self.clock.now());
        let stored = self.persist(list).await?;

        info!(
            client_list_id = %client_list_id,
            item_count = stored.item_count,
            created,
            "Pushed list to client"
        );

        self.event_bus
            .emit(CoreEvent::Sync(ListSyncEvent::Pushed {
                list_id: stored.id.to_string(),
                client_id: client_id.0,
                client_list_id,
                item_count: stored.item_count,
                created,
            }))
            .ok();

        Ok(())
    }

    /// Pull a remote list into the canonical store.
    ///
    /// When one of `user_id`'s lists of `kind` is already bound to
    /// `client_list_id` on this client it is overwritten; otherwise a new
    /// canonical list is created and bound.
    #[instrument(skip(self, cancel), fields(user_id = %user_id, client_id = %client_id, kind = %kind))]
    pub async fn sync_from_client(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        client_id: ClientId,
        kind: ListKind,
        client_list_id: &str,
    ) -> Result<ItemList> {
        let result = self
            .pull(cancel, user_id, client_id, kind, client_list_id)
            .await;
        if let Err(e) = &result {
            self.emit_failure(None, client_id, "pull", e);
        }
        result
    }

    async fn pull(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        client_id: ClientId,
        kind: ListKind,
        client_list_id: &str,
    ) -> Result<ItemList> {
        if client_list_id.is_empty() {
            return Err(SyncError::Validation(
                "client_list_id must not be empty".to_string(),
            ));
        }

        let resolved = self.resolver.resolve(client_id, kind).await?;
        let remote = self
            .remote(cancel, client_id, resolved.provider.get_list(client_list_id))
            .await?;

        let item_ids: Vec<ItemId> = remote.item_ids().into_iter().map(ItemId).collect();
        let now = self.clock.now();
        let origin = Origin::Client(client_id);

        let existing = self
            .repository
            .find_by_client_list(user_id, kind, client_id, client_list_id)
            .await?;

        let (stored, created) = match existing {
            Some(mut list) => {
                debug!(list_id = %list.id, "Overwriting bound list");
                list.title = remote.name;
                list.description = remote.description;
                list.is_public = remote.is_public;
                list.replace_items_from_remote(&item_ids, client_id, now);
                list.touch(origin, now);
                list.record_sync(client_id, client_list_id, now);
                (self.persist(list).await?, false)
            }
            None => {
                let mut list = ItemList::new(user_id, kind, remote.name, now);
                list.description = remote.description;
                list.is_public = remote.is_public;
                list.replace_items_from_remote(&item_ids, client_id, now);
                list.touch(origin, now);
                list.record_sync(client_id, client_list_id, now);
                list.apply_history_retention(self.config.history_retention.as_ref());
                (self.repository.create(user_id, &list).await?, true)
            }
        };

        info!(
            list_id = %stored.id,
            client_list_id,
            item_count = stored.item_count,
            created,
            "Pulled list from client"
        );

        self.event_bus
            .emit(CoreEvent::Sync(ListSyncEvent::Pulled {
                list_id: stored.id.to_string(),
                client_id: client_id.0,
                client_list_id: client_list_id.to_string(),
                item_count: stored.item_count,
                created,
            }))
            .ok();

        Ok(stored)
    }

    /// Push the list to every client it has a sync state for.
    ///
    /// Each push is independent: one client failing neither stops the others
    /// nor undoes pushes that already succeeded.
    ///
    /// # Errors
    ///
    /// Only the initial load fails the whole call (`ListNotFound`,
    /// `PermissionDenied`); per-client failures are in the report.
    #[instrument(skip(self, cancel), fields(user_id = %user_id, list_id = %list_id))]
    pub async fn sync_to_all_clients(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        list_id: &ListId,
    ) -> Result<BTreeMap<ClientId, Result<()>>> {
        let list = self.load_owned(user_id, list_id).await?;
        let clients: Vec<ClientId> = list.sync_states.keys().copied().collect();

        let mut report = BTreeMap::new();
        for client_id in clients {
            let outcome = self.sync_to_client(cancel, user_id, list_id, client_id).await;
            if let Err(e) = &outcome {
                warn!(client_id = %client_id, error = %e, "Push to client failed");
            }
            report.insert(client_id, outcome);
        }

        let failed = report.values().filter(|r| r.is_err()).count();
        info!(clients = report.len(), failed, "Finished pushing to all clients");
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Sync state
    // ------------------------------------------------------------------------

    pub async fn get_sync_status(&self, list_id: &ListId) -> Result<BTreeMap<ClientId, SyncState>> {
        let list = self
            .repository
            .get_by_id(list_id)
            .await?
            .ok_or_else(|| SyncError::ListNotFound {
                list_id: list_id.to_string(),
            })?;

        Ok(list.sync_states)
    }

    /// Overwrite the sync state recorded for `client_id`, e.g. to mark a
    /// queued push as pending. The client must resolve and support the
    /// list's kind, otherwise nothing is written.
    #[instrument(skip(self, state), fields(user_id = %user_id, list_id = %list_id, client_id = %client_id, status = %state.status))]
    pub async fn update_sync_status(
        &self,
        user_id: UserId,
        list_id: &ListId,
        client_id: ClientId,
        state: SyncState,
    ) -> Result<ItemList> {
        if state.status == SyncStatus::Success && !state.is_bound() {
            return Err(SyncError::Validation(
                "a successful sync state needs a client_list_id".to_string(),
            ));
        }

        let mut list = self.load_owned(user_id, list_id).await?;
        // Only clients able to hold this kind of list may own a sync state.
        self.resolver.resolve(client_id, list.kind).await?;

        let status = state.status;
        list.sync_states.insert(client_id, state);
        let stored = self.persist(list).await?;

        self.event_bus
            .emit(CoreEvent::Library(ListEvent::SyncStatusChanged {
                list_id: stored.id.to_string(),
                client_id: client_id.0,
                status: status.to_string(),
            }))
            .ok();

        Ok(stored)
    }

    // ------------------------------------------------------------------------
    // Local edits
    // ------------------------------------------------------------------------

    /// Reorder the list. `ordered` must name every current entry.
    #[instrument(skip(self, ordered), fields(user_id = %user_id, list_id = %list_id, count = ordered.len()))]
    pub async fn reorder_items(
        &self,
        user_id: UserId,
        list_id: &ListId,
        ordered: &[ItemId],
    ) -> Result<ItemList> {
        let mut list = self.load_owned(user_id, list_id).await?;
        list.reorder(ordered, Origin::User(user_id), self.clock.now())?;
        let stored = self.persist(list).await?;

        self.event_bus
            .emit(CoreEvent::Library(ListEvent::Reordered {
                list_id: stored.id.to_string(),
                item_count: stored.item_count,
            }))
            .ok();

        Ok(stored)
    }

    /// Append items to the end of the list, in the given order
    #[instrument(skip(self, item_ids), fields(user_id = %user_id, list_id = %list_id, count = item_ids.len()))]
    pub async fn add_items(
        &self,
        user_id: UserId,
        list_id: &ListId,
        item_ids: &[ItemId],
    ) -> Result<ItemList> {
        if item_ids.is_empty() {
            return Err(SyncError::Validation("no items to add".to_string()));
        }

        let mut list = self.load_owned(user_id, list_id).await?;
        let now = self.clock.now();
        for item_id in item_ids {
            list.add_item(*item_id, Origin::User(user_id), now);
        }
        let stored = self.persist(list).await?;

        self.event_bus
            .emit(CoreEvent::Library(ListEvent::ItemsAdded {
                list_id: stored.id.to_string(),
                count: item_ids.len() as u32,
            }))
            .ok();

        Ok(stored)
    }

    /// Remove every entry of each given item. Ids not in the list are
    /// ignored; when nothing matches the list is returned unchanged.
    #[instrument(skip(self, item_ids), fields(user_id = %user_id, list_id = %list_id, count = item_ids.len()))]
    pub async fn remove_items(
        &self,
        user_id: UserId,
        list_id: &ListId,
        item_ids: &[ItemId],
    ) -> Result<ItemList> {
        let mut list = self.load_owned(user_id, list_id).await?;
        let before = list.items.len();
        let now = self.clock.now();
        for item_id in item_ids {
            list.remove_item(*item_id, Origin::User(user_id), now);
        }

        let removed = before - list.items.len();
        if removed == 0 {
            debug!("No matching items to remove");
            return Ok(list);
        }

        let stored = self.persist(list).await?;

        self.event_bus
            .emit(CoreEvent::Library(ListEvent::ItemsRemoved {
                list_id: stored.id.to_string(),
                count: removed as u32,
            }))
            .ok();

        Ok(stored)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load_owned(&self, user_id: UserId, list_id: &ListId) -> Result<ItemList> {
        let list = self
            .repository
            .get_by_id(list_id)
            .await?
            .ok_or_else(|| SyncError::ListNotFound {
                list_id: list_id.to_string(),
            })?;

        if list.owner_id != user_id {
            return Err(SyncError::PermissionDenied {
                user_id,
                list_id: list_id.to_string(),
            });
        }

        Ok(list)
    }

    async fn persist(&self, mut list: ItemList) -> Result<ItemList> {
        list.apply_history_retention(self.config.history_retention.as_ref());
        Ok(self.repository.update(&list).await?)
    }

    /// Run one provider call under the cancellation token and the configured
    /// timeout.
    async fn remote<T, F>(&self, cancel: &CancellationToken, client_id: ClientId, call: F) -> Result<T>
    where
        F: Future<Output = BridgeResult<T>>,
    {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let timeout = self.config.remote_call_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            outcome = tokio::time::timeout(timeout, call) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(SyncError::RemoteProvider { client_id, source }),
                Err(_) => Err(SyncError::Timeout(timeout)),
            },
        }
    }

    fn emit_failure(
        &self,
        list_id: Option<&ListId>,
        client_id: ClientId,
        operation: &str,
        error: &SyncError,
    ) {
        warn!(client_id = %client_id, operation, error = %error, "List sync failed");

        self.event_bus
            .emit(CoreEvent::Sync(ListSyncEvent::Failed {
                list_id: list_id.map(ToString::to_string),
                client_id: client_id.0,
                operation: operation.to_string(),
                message: error.to_string(),
            }))
            .ok();
    }
}

/// Canonical items in position order, positions rewritten densely
fn outbound_items(list: &ItemList) -> Vec<RemoteListItem> {
    let mut items: Vec<_> = list.items.iter().collect();
    items.sort_by_key(|item| item.position);
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| RemoteListItem::new(item.item_id.0, index as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_outbound_items_follow_positions() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut list = ItemList::new(UserId(1), ListKind::Playlist, "Mix", at);
        for id in [30, 10, 20] {
            list.add_item(ItemId(id), Origin::User(UserId(1)), at);
        }
        // Stored order no longer matches positions
        list.items.swap(0, 2);

        let items = outbound_items(&list);
        assert_eq!(
            items,
            vec![
                RemoteListItem::new(30, 0),
                RemoteListItem::new(10, 1),
                RemoteListItem::new(20, 2),
            ]
        );
    }

    #[test]
    fn test_default_config() {
        let config = ListSyncConfig::default();
        assert_eq!(config.remote_call_timeout, Duration::from_secs(30));
        assert!(format!("{:?}", config).contains("remote_call_timeout"));
    }
}
