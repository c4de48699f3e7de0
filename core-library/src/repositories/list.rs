//! List repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{
    ChangeRecord, ClientId, ItemId, ItemList, ListId, ListItem, ListKind, Origin, SyncState,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

/// Persistence interface for canonical lists
#[async_trait]
pub trait ListRepository: Send + Sync {
    /// Load a list with its items and sync states
    ///
    /// # Returns
    /// - `Ok(Some(list))` if found
    /// - `Ok(None)` if not found
    async fn get_by_id(&self, id: &ListId) -> Result<Option<ItemList>>;

    /// Persist a new list owned by `owner_id` and return the stored copy.
    async fn create(&self, owner_id: UserId, list: &ItemList) -> Result<ItemList>;

    /// Replace the stored list, including all items and sync states.
    ///
    /// `list.version` must match the stored version; the returned copy carries
    /// the bumped version.
    ///
    /// # Errors
    /// - `LibraryError::NotFound` if the list does not exist
    /// - `LibraryError::Conflict` if the list changed since it was loaded
    async fn update(&self, list: &ItemList) -> Result<ItemList>;

    /// All lists of `kind` owned by `owner_id`, oldest first
    async fn search(&self, owner_id: UserId, kind: ListKind) -> Result<Vec<ItemList>>;

    /// Delete a list with its items and sync states
    ///
    /// # Returns
    /// - `Ok(true)` if the list was deleted
    /// - `Ok(false)` if the list was not found
    async fn delete(&self, id: &ListId) -> Result<bool>;

    /// Find the owner's list already bound to `client_list_id` on `client_id`.
    ///
    /// The default scans [`search`](Self::search); stores with an index over
    /// sync states should override it.
    async fn find_by_client_list(
        &self,
        owner_id: UserId,
        kind: ListKind,
        client_id: ClientId,
        client_list_id: &str,
    ) -> Result<Option<ItemList>> {
        let lists = self.search(owner_id, kind).await?;
        Ok(lists
            .into_iter()
            .find(|list| list.is_bound_to(client_id, client_list_id)))
    }
}

#[derive(Debug, FromRow)]
struct ItemListRow {
    id: String,
    kind: String,
    owner_id: i64,
    title: String,
    description: String,
    is_public: bool,
    modified_by: String,
    last_modified: i64,
    last_synced: Option<i64>,
    created_at: i64,
    version: i64,
}

#[derive(Debug, FromRow)]
struct ListItemRow {
    position: i64,
    item_id: i64,
    last_changed: i64,
    change_history: String,
}

#[derive(Debug, FromRow)]
struct SyncStateRow {
    client_id: i64,
    client_list_id: String,
    last_synced: Option<i64>,
    status: String,
}

/// Timestamp columns hold unix nanoseconds, matching the precision of the
/// change history JSON.
fn to_nanos(at: DateTime<Utc>) -> Result<i64> {
    at.timestamp_nanos_opt()
        .ok_or_else(|| LibraryError::Serialization(format!("timestamp out of range: {}", at)))
}

fn from_nanos(ns: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(ns)
}

impl ItemListRow {
    fn into_model(self, items: Vec<ListItemRow>, states: Vec<SyncStateRow>) -> Result<ItemList> {
        let items = items
            .into_iter()
            .map(|row| -> Result<ListItem> {
                let change_history: Vec<ChangeRecord> = serde_json::from_str(&row.change_history)?;
                Ok(ListItem {
                    item_id: ItemId::from_db(row.item_id),
                    position: row.position as u32,
                    last_changed: from_nanos(row.last_changed),
                    change_history,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let sync_states = states
            .into_iter()
            .map(|row| -> Result<(ClientId, SyncState)> {
                let state = SyncState {
                    client_list_id: row.client_list_id,
                    last_synced: row.last_synced.map(from_nanos),
                    status: row.status.parse()?,
                };
                Ok((ClientId::from_db(row.client_id), state))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(ItemList {
            id: ListId::from_string(&self.id)?,
            kind: self.kind.parse()?,
            title: self.title,
            description: self.description,
            owner_id: UserId::from_db(self.owner_id),
            is_public: self.is_public,
            item_count: items.len() as u32,
            items,
            sync_states,
            last_modified: from_nanos(self.last_modified),
            modified_by: self.modified_by.parse::<Origin>()?,
            last_synced: self.last_synced.map(from_nanos),
            created_at: from_nanos(self.created_at),
            version: self.version,
        })
    }
}

/// SQLite implementation of ListRepository
pub struct SqliteListRepository {
    pool: SqlitePool,
}

impl SqliteListRepository {
    /// Create a new SqliteListRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load(&self, row: ItemListRow) -> Result<ItemList> {
        let items = query_as::<_, ListItemRow>(
            r#"
            SELECT position, item_id, last_changed, change_history
            FROM list_items
            WHERE list_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let states = query_as::<_, SyncStateRow>(
            r#"
            SELECT client_id, client_list_id, last_synced, status
            FROM list_sync_states
            WHERE list_id = ?
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        row.into_model(items, states)
    }
}

/// Insert item and sync state rows for `list`. Positions are written from
/// the vector index so the stored order is always dense.
async fn write_children(conn: &mut SqliteConnection, list: &ItemList) -> Result<()> {
    let list_id = list.id.to_string();

    for (index, item) in list.items.iter().enumerate() {
        let history = serde_json::to_string(&item.change_history)?;
        query(
            r#"
            INSERT INTO list_items (list_id, position, item_id, last_changed, change_history)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&list_id)
        .bind(index as i64)
        .bind(item.item_id.as_db())
        .bind(to_nanos(item.last_changed)?)
        .bind(history)
        .execute(&mut *conn)
        .await?;
    }

    for (client_id, state) in &list.sync_states {
        query(
            r#"
            INSERT INTO list_sync_states (list_id, client_id, client_list_id, last_synced, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&list_id)
        .bind(client_id.as_db())
        .bind(&state.client_list_id)
        .bind(state.last_synced.map(to_nanos).transpose()?)
        .bind(state.status.as_str())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl ListRepository for SqliteListRepository {
    async fn get_by_id(&self, id: &ListId) -> Result<Option<ItemList>> {
        let row = query_as::<_, ItemListRow>("SELECT * FROM item_lists WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, owner_id: UserId, list: &ItemList) -> Result<ItemList> {
        let mut stored = list.clone();
        stored.owner_id = owner_id;
        stored.version = 0;
        stored.normalize_positions();

        let mut tx = self.pool.begin().await?;

        query(
            r#"
            INSERT INTO item_lists (
                id, kind, owner_id, title, description, is_public, item_count,
                modified_by, last_modified, last_synced, created_at, version
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stored.id.to_string())
        .bind(stored.kind.as_str())
        .bind(stored.owner_id.as_db())
        .bind(&stored.title)
        .bind(&stored.description)
        .bind(stored.is_public)
        .bind(stored.item_count as i64)
        .bind(stored.modified_by.to_string())
        .bind(to_nanos(stored.last_modified)?)
        .bind(stored.last_synced.map(to_nanos).transpose()?)
        .bind(to_nanos(stored.created_at)?)
        .bind(stored.version)
        .execute(&mut *tx)
        .await?;

        write_children(&mut *tx, &stored).await?;
        tx.commit().await?;

        debug!(list_id = %stored.id, items = stored.item_count, "Created list");
        Ok(stored)
    }

    async fn update(&self, list: &ItemList) -> Result<ItemList> {
        let mut stored = list.clone();
        stored.normalize_positions();
        let id = stored.id.to_string();

        let mut tx = self.pool.begin().await?;

        let result = query(
            r#"
            UPDATE item_lists
            SET kind = ?, owner_id = ?, title = ?, description = ?, is_public = ?,
                item_count = ?, modified_by = ?, last_modified = ?, last_synced = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(stored.kind.as_str())
        .bind(stored.owner_id.as_db())
        .bind(&stored.title)
        .bind(&stored.description)
        .bind(stored.is_public)
        .bind(stored.item_count as i64)
        .bind(stored.modified_by.to_string())
        .bind(to_nanos(stored.last_modified)?)
        .bind(stored.last_synced.map(to_nanos).transpose()?)
        .bind(&id)
        .bind(stored.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = query_as::<_, (i64,)>("SELECT version FROM item_lists WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            return Err(match current {
                Some((current_version,)) => {
                    debug!(
                        list_id = %id,
                        expected = stored.version,
                        current = current_version,
                        "Rejected stale list update"
                    );
                    LibraryError::Conflict {
                        entity_type: "ItemList".to_string(),
                        id,
                        expected_version: stored.version,
                    }
                }
                None => LibraryError::NotFound {
                    entity_type: "ItemList".to_string(),
                    id,
                },
            });
        }

        query("DELETE FROM list_items WHERE list_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        query("DELETE FROM list_sync_states WHERE list_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        write_children(&mut *tx, &stored).await?;
        tx.commit().await?;

        stored.version += 1;
        debug!(list_id = %id, version = stored.version, "Updated list");
        Ok(stored)
    }

    async fn search(&self, owner_id: UserId, kind: ListKind) -> Result<Vec<ItemList>> {
        let rows = query_as::<_, ItemListRow>(
            r#"
            SELECT * FROM item_lists
            WHERE owner_id = ? AND kind = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id.as_db())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut lists = Vec::with_capacity(rows.len());
        for row in rows {
            lists.push(self.load(row).await?);
        }
        Ok(lists)
    }

    async fn delete(&self, id: &ListId) -> Result<bool> {
        // Items and sync states go with the list (ON DELETE CASCADE)
        let result = query("DELETE FROM item_lists WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_client_list(
        &self,
        owner_id: UserId,
        kind: ListKind,
        client_id: ClientId,
        client_list_id: &str,
    ) -> Result<Option<ItemList>> {
        if client_list_id.is_empty() {
            return Ok(None);
        }

        let row = query_as::<_, ItemListRow>(
            r#"
            SELECT l.* FROM item_lists l
            JOIN list_sync_states s ON s.list_id = l.id
            WHERE l.owner_id = ? AND l.kind = ? AND s.client_id = ? AND s.client_list_id = ?
            ORDER BY l.created_at ASC, l.id ASC
            LIMIT 1
            "#,
        )
        .bind(owner_id.as_db())
        .bind(kind.as_str())
        .bind(client_id.as_db())
        .bind(client_list_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }
}
