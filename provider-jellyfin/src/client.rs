//! `MediaClient` and playlist `ListProvider` for Jellyfin

use async_trait::async_trait;
use bridge_traits::clients::{ClientType, MediaClient};
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::HttpClient;
use bridge_traits::lists::{ItemIdMapper, ListProvider, RemoteList, RemoteListItem};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::connector::{JellyfinConfig, JellyfinConnector};

/// Playlist provider backed by the Jellyfin playlist API
///
/// Canonical items without a Jellyfin counterpart are left out of pushes,
/// and Jellyfin items unknown to the mapper are left out of pulls.
/// Jellyfin's create endpoint has no description field, so descriptions
/// are read from the playlist's overview but never written.
pub struct JellyfinPlaylistProvider {
    connector: JellyfinConnector,
    mapper: Arc<dyn ItemIdMapper>,
}

impl JellyfinPlaylistProvider {
    pub fn new(connector: JellyfinConnector, mapper: Arc<dyn ItemIdMapper>) -> Self {
        Self { connector, mapper }
    }

    fn client_id(&self) -> u64 {
        self.connector.config().client_id
    }

    async fn to_jellyfin_ids(&self, items: &[RemoteListItem]) -> Result<Vec<String>> {
        let mut ordered: Vec<&RemoteListItem> = items.iter().collect();
        ordered.sort_by_key(|item| item.position);

        let mut ids = Vec::with_capacity(ordered.len());
        for item in ordered {
            match self
                .mapper
                .to_client_item(self.client_id(), item.item_id)
                .await?
            {
                Some(id) => ids.push(id),
                None => warn!(item_id = item.item_id, "Item has no Jellyfin counterpart, skipping"),
            }
        }
        Ok(ids)
    }

    async fn from_jellyfin_ids(&self, ids: &[String]) -> Result<Vec<RemoteListItem>> {
        let mut items = Vec::with_capacity(ids.len());
        for jellyfin_id in ids {
            match self
                .mapper
                .from_client_item(self.client_id(), jellyfin_id)
                .await?
            {
                Some(item_id) => items.push(RemoteListItem::new(item_id, items.len() as u32)),
                None => debug!(jellyfin_id = %jellyfin_id, "Unknown Jellyfin item, skipping"),
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl ListProvider for JellyfinPlaylistProvider {
    #[instrument(skip(self, _description, items), fields(client_id = self.client_id(), item_count = items.len()))]
    async fn create_list(
        &self,
        name: &str,
        _description: &str,
        items: &[RemoteListItem],
        is_public: bool,
    ) -> Result<String> {
        let ids = self.to_jellyfin_ids(items).await?;
        let playlist_id = self.connector.create_playlist(name, ids, is_public).await?;
        info!(playlist_id = %playlist_id, "Created Jellyfin playlist");
        Ok(playlist_id)
    }

    #[instrument(skip(self, _description, items), fields(client_id = self.client_id(), item_count = items.len()))]
    async fn update_list(
        &self,
        remote_list_id: &str,
        name: &str,
        _description: &str,
        items: &[RemoteListItem],
        is_public: bool,
    ) -> Result<()> {
        let ids = self.to_jellyfin_ids(items).await?;
        self.connector
            .update_playlist(remote_list_id, name, ids, is_public)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(client_id = self.client_id()))]
    async fn get_list(&self, remote_list_id: &str) -> Result<RemoteList> {
        let playlist = self.connector.get_playlist(remote_list_id).await?;
        let item = self.connector.get_item(remote_list_id).await?;
        let items = self.from_jellyfin_ids(&playlist.item_ids).await?;

        Ok(RemoteList {
            name: item.name,
            description: item.overview.unwrap_or_default(),
            items,
            is_public: playlist.open_access,
        })
    }
}

/// A configured Jellyfin server
pub struct JellyfinClient {
    client_id: u64,
    playlists_enabled: bool,
    playlists: Arc<JellyfinPlaylistProvider>,
}

impl JellyfinClient {
    /// # Errors
    ///
    /// `BridgeError::NotAvailable` when the configuration is invalid.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        config: JellyfinConfig,
        mapper: Arc<dyn ItemIdMapper>,
    ) -> Result<Self> {
        let client_id = config.client_id;
        let playlists_enabled = config.playlists_enabled;
        let connector = JellyfinConnector::new(http_client, config).map_err(BridgeError::from)?;

        Ok(Self {
            client_id,
            playlists_enabled,
            playlists: Arc::new(JellyfinPlaylistProvider::new(connector, mapper)),
        })
    }
}

impl MediaClient for JellyfinClient {
    fn client_id(&self) -> u64 {
        self.client_id
    }

    fn client_type(&self) -> ClientType {
        ClientType::Jellyfin
    }

    fn supports_playlists(&self) -> bool {
        self.playlists_enabled
    }

    fn playlist_provider(&self) -> Result<Arc<dyn ListProvider>> {
        let provider: Arc<dyn ListProvider> = self.playlists.clone();
        Ok(provider)
    }
}
