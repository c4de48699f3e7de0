//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] into a running list sync core:
//! the SQLite pool and repository, the client resolver over the host's
//! `ClientFactory`, the event bus, and the [`ListSyncService`]. Desktop hosts
//! typically keep the default `desktop-shims` feature so an HTTP client is
//! available for provider crates; the `jellyfin` feature adds a helper that
//! builds Jellyfin clients on top of it.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::http::HttpClient;
use bridge_traits::Clock;
use core_library::db::{self, DatabaseConfig};
use core_library::{ItemList, ListId, ListKind, ListRepository, SqliteListRepository, UserId};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::init_logging;
use core_sync::{ClientResolver, ListSyncConfig, ListSyncService, SyncError};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

#[cfg(feature = "jellyfin")]
pub use provider_jellyfin::{JellyfinClient, JellyfinConfig};

/// Path that selects a private in-memory database
const IN_MEMORY_PATH: &str = ":memory:";

/// Install the configured subscriber. A host that already installed its own
/// keeps it.
fn install_logging(config: &CoreConfig) -> Result<()> {
    match init_logging(config.logging.clone()) {
        Ok(()) => Ok(()),
        Err(core_runtime::Error::LoggingAlreadyInitialized) => {
            debug!("Tracing subscriber already installed, keeping it");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    pool: Pool<Sqlite>,
    repository: Arc<dyn ListRepository>,
    sync: Arc<ListSyncService>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreService {
    /// Open the database and assemble the services described by `config`.
    ///
    /// ```ignore
    /// let config = CoreConfig::builder()
    ///     .database_path("/var/lib/listsync/lists.db")
    ///     .client_factory(factory)
    ///     .build()?;
    /// let core = CoreService::bootstrap(config).await?;
    /// core.sync().sync_to_client(&cancel, user, &list_id, client).await?;
    /// ```
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        install_logging(&config)?;

        let database = if config.database_path.as_os_str() == IN_MEMORY_PATH {
            DatabaseConfig::in_memory()
        } else {
            DatabaseConfig::new(&config.database_path)
        };
        let pool = db::create_pool(database)
            .await
            .map_err(|e| CoreError::InitializationFailed(format!("database: {}", e)))?;

        let service = Self::with_pool(config, pool);
        info!("List sync core initialized");
        Ok(service)
    }

    /// Assemble the services over an existing, migrated pool
    pub fn with_pool(config: CoreConfig, pool: Pool<Sqlite>) -> Self {
        let repository: Arc<dyn ListRepository> =
            Arc::new(SqliteListRepository::new(pool.clone()));
        let event_bus = EventBus::new(config.event_buffer_size);
        let sync_config = ListSyncConfig {
            remote_call_timeout: config.remote_call_timeout,
            ..ListSyncConfig::default()
        };

        let sync = ListSyncService::new(
            Arc::clone(&repository),
            ClientResolver::new(Arc::clone(&config.client_factory)),
            Arc::clone(&config.clock),
            event_bus.clone(),
            sync_config,
        );

        Self {
            pool,
            repository,
            sync: Arc::new(sync),
            event_bus,
            clock: config.clock,
            http_client: config.http_client,
        }
    }

    /// Push, pull and list editing operations
    pub fn sync(&self) -> Arc<ListSyncService> {
        Arc::clone(&self.sync)
    }

    pub fn repository(&self) -> Arc<dyn ListRepository> {
        Arc::clone(&self.repository)
    }

    pub fn events(&self) -> EventStream {
        self.event_bus.stream()
    }

    pub fn http_client(&self) -> Option<Arc<dyn HttpClient>> {
        self.http_client.clone()
    }

    /// Verify the database answers queries
    pub async fn health_check(&self) -> Result<()> {
        db::health_check(&self.pool).await?;
        Ok(())
    }

    /// Create an empty canonical list owned by `owner_id`
    pub async fn create_list(
        &self,
        owner_id: UserId,
        kind: ListKind,
        title: &str,
    ) -> Result<ItemList> {
        if title.trim().is_empty() {
            return Err(SyncError::Validation("title must not be empty".to_string()).into());
        }

        let list = ItemList::new(owner_id, kind, title, self.clock.now());
        Ok(self.repository.create(owner_id, &list).await?)
    }

    /// Lists of one kind owned by `owner_id`
    pub async fn lists(&self, owner_id: UserId, kind: ListKind) -> Result<Vec<ItemList>> {
        Ok(self.repository.search(owner_id, kind).await?)
    }

    /// Delete a canonical list. Remote copies are left in place.
    pub async fn delete_list(&self, user_id: UserId, list_id: &ListId) -> Result<()> {
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
            }
            .into());
        }

        self.repository.delete(list_id).await?;
        Ok(())
    }

    /// Build a Jellyfin client over the configured HTTP client, ready to be
    /// returned from the host's `ClientFactory`.
    #[cfg(feature = "jellyfin")]
    pub fn jellyfin_client(
        &self,
        config: JellyfinConfig,
        mapper: Arc<dyn bridge_traits::ItemIdMapper>,
    ) -> Result<Arc<dyn bridge_traits::MediaClient>> {
        let http_client = self.http_client.clone().ok_or_else(|| CoreError::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "Jellyfin clients need an HttpClient. Enable `desktop-shims` or inject one \
                      with `.http_client(...)`."
                .to_string(),
        })?;

        let client = JellyfinClient::new(http_client, config, mapper)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ClientFactory, MediaClient};
    use core_library::{ClientId, ItemId};
    use core_runtime::logging::{LogFormat, LoggingConfig};
    use tokio_util::sync::CancellationToken;

    struct EmptyFactory;

    #[async_trait]
    impl ClientFactory for EmptyFactory {
        async fn get_client(&self, _client_id: u64) -> BridgeResult<Option<Arc<dyn MediaClient>>> {
            Ok(None)
        }
    }

    async fn core() -> CoreService {
        let config = CoreConfig::builder()
            .database_path(IN_MEMORY_PATH)
            .client_factory(Arc::new(EmptyFactory))
            .build()
            .unwrap();
        CoreService::bootstrap(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_in_memory() {
        let core = core().await;
        core.health_check().await.unwrap();
        assert!(core.lists(UserId(1), ListKind::Playlist).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_edit_and_delete() {
        let core = core().await;
        let owner = UserId(7);

        let list = core
            .create_list(owner, ListKind::Collection, "Favourites")
            .await
            .unwrap();
        let edited = core
            .sync()
            .add_items(owner, &list.id, &[ItemId(1), ItemId(2)])
            .await
            .unwrap();
        assert_eq!(edited.item_count, 2);

        let denied = core.delete_list(UserId(8), &list.id).await;
        assert!(matches!(
            denied,
            Err(CoreError::Sync(SyncError::PermissionDenied { .. }))
        ));

        core.delete_list(owner, &list.id).await.unwrap();
        assert!(core.repository().get_by_id(&list.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_applies_logging_config() {
        let logging = || LoggingConfig::default().with_format(LogFormat::Compact);
        let config = |logging: LoggingConfig| {
            CoreConfig::builder()
                .database_path(IN_MEMORY_PATH)
                .client_factory(Arc::new(EmptyFactory))
                .logging(logging)
                .build()
                .unwrap()
        };

        CoreService::bootstrap(config(logging())).await.unwrap();
        CoreService::bootstrap(config(logging())).await.unwrap();

        let invalid = CoreService::bootstrap(config(logging().with_filter("core_sync=loud")))
            .await;
        assert!(matches!(
            invalid,
            Err(CoreError::Runtime(core_runtime::Error::Config(_)))
        ));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let core = core().await;
        let result = core.create_list(UserId(1), ListKind::Playlist, "  ").await;
        assert!(matches!(result, Err(CoreError::Sync(SyncError::Validation(_)))));
    }

    #[tokio::test]
    async fn test_push_to_unknown_client_surfaces_event() {
        let core = core().await;
        let mut events = core.events();
        let list = core
            .create_list(UserId(1), ListKind::Playlist, "Mix")
            .await
            .unwrap();

        let result = core
            .sync()
            .sync_to_client(&CancellationToken::new(), UserId(1), &list.id, ClientId(5))
            .await;
        assert!(matches!(result, Err(SyncError::ClientNotFound { .. })));

        let event = events.recv().await.unwrap();
        assert_eq!(event.description(), "List sync failed");
    }
}
