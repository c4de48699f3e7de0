//! Client resolution
//!
//! Turns a client id and a list kind into a usable provider, answering the
//! capability questions before any remote list call is made.

use crate::error::{Result, SyncError};
use bridge_traits::error::BridgeError;
use bridge_traits::{ClientFactory, ListProvider, MediaClient};
use core_library::{ClientId, ListKind};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A client that can hold lists of the requested kind, with its provider
#[derive(Clone)]
pub struct ResolvedClient {
    pub client: Arc<dyn MediaClient>,
    pub provider: Arc<dyn ListProvider>,
}

impl std::fmt::Debug for ResolvedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedClient")
            .field("client_id", &self.client.client_id())
            .field("client_type", &self.client.client_type())
            .finish()
    }
}

/// Looks up clients through the host's [`ClientFactory`]. Stateless.
#[derive(Clone)]
pub struct ClientResolver {
    factory: Arc<dyn ClientFactory>,
}

impl ClientResolver {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    /// Resolve `client_id` to a provider for `kind` lists.
    ///
    /// # Errors
    ///
    /// - `SyncError::ClientNotFound` when no such client is configured
    /// - `SyncError::UnsupportedCapability` when the client has no list API
    ///   for `kind`, or has it switched off
    /// - `SyncError::RemoteProvider` when the client registry itself fails
    #[instrument(skip(self), fields(client_id = %client_id, kind = %kind))]
    pub async fn resolve(&self, client_id: ClientId, kind: ListKind) -> Result<ResolvedClient> {
        let client = match self.factory.get_client(client_id.0).await {
            Ok(Some(client)) => client,
            Ok(None) | Err(BridgeError::NotFound(_)) => {
                return Err(SyncError::ClientNotFound { client_id })
            }
            Err(source) => return Err(SyncError::RemoteProvider { client_id, source }),
        };

        let supported = match kind {
            ListKind::Playlist => client.supports_playlists(),
            ListKind::Collection => client.supports_collections(),
        };

        if !supported {
            debug!(client_type = %client.client_type(), "Client lacks list capability");
            return Err(SyncError::UnsupportedCapability { client_id, kind });
        }

        let provider = match kind {
            ListKind::Playlist => client.playlist_provider(),
            ListKind::Collection => client.collection_provider(),
        }
        .map_err(|e| match e {
            BridgeError::NotAvailable(_) => SyncError::UnsupportedCapability { client_id, kind },
            source => SyncError::RemoteProvider { client_id, source },
        })?;

        Ok(ResolvedClient { client, provider })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ClientType, RemoteList, RemoteListItem};
    use mockall::mock;

    mock! {
        pub Factory {}

        #[async_trait]
        impl ClientFactory for Factory {
            async fn get_client(&self, client_id: u64) -> BridgeResult<Option<Arc<dyn MediaClient>>>;
        }
    }

    mock! {
        pub Client {}

        impl MediaClient for Client {
            fn client_id(&self) -> u64;
            fn client_type(&self) -> ClientType;
            fn supports_playlists(&self) -> bool;
            fn supports_collections(&self) -> bool;
            fn playlist_provider(&self) -> BridgeResult<Arc<dyn ListProvider>>;
            fn collection_provider(&self) -> BridgeResult<Arc<dyn ListProvider>>;
        }
    }

    struct NullProvider;

    #[async_trait]
    impl ListProvider for NullProvider {
        async fn create_list(
            &self,
            _name: &str,
            _description: &str,
            _items: &[RemoteListItem],
            _is_public: bool,
        ) -> BridgeResult<String> {
            Ok("remote".to_string())
        }

        async fn update_list(
            &self,
            _remote_list_id: &str,
            _name: &str,
            _description: &str,
            _items: &[RemoteListItem],
            _is_public: bool,
        ) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_list(&self, _remote_list_id: &str) -> BridgeResult<RemoteList> {
            Ok(RemoteList::default())
        }
    }

    fn resolver_for(client: MockClient) -> ClientResolver {
        let client: Arc<dyn MediaClient> = Arc::new(client);
        let mut factory = MockFactory::new();
        factory
            .expect_get_client()
            .returning(move |_| Ok(Some(Arc::clone(&client))));
        ClientResolver::new(Arc::new(factory))
    }

    #[tokio::test]
    async fn test_resolves_playlist_provider() {
        let mut client = MockClient::new();
        client.expect_supports_playlists().return_const(true);
        client
            .expect_playlist_provider()
            .times(1)
            .returning(|| Ok(Arc::new(NullProvider) as Arc<dyn ListProvider>));
        client.expect_client_id().return_const(42u64);
        client.expect_client_type().return_const(ClientType::Jellyfin);

        let resolved = resolver_for(client)
            .resolve(ClientId(42), ListKind::Playlist)
            .await
            .unwrap();

        assert_eq!(resolved.client.client_id(), 42);
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let mut factory = MockFactory::new();
        factory.expect_get_client().returning(|_| Ok(None));
        let resolver = ClientResolver::new(Arc::new(factory));

        let result = resolver.resolve(ClientId(7), ListKind::Playlist).await;
        assert!(matches!(
            result,
            Err(SyncError::ClientNotFound { client_id: ClientId(7) })
        ));
    }

    #[tokio::test]
    async fn test_disabled_capability_never_touches_provider() {
        let mut client = MockClient::new();
        client.expect_supports_collections().return_const(false);
        client.expect_collection_provider().times(0);
        client.expect_client_type().return_const(ClientType::Plex);

        let result = resolver_for(client)
            .resolve(ClientId(42), ListKind::Collection)
            .await;

        assert!(matches!(
            result,
            Err(SyncError::UnsupportedCapability {
                kind: ListKind::Collection,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_provider_is_unsupported() {
        let mut client = MockClient::new();
        client.expect_supports_playlists().return_const(true);
        client
            .expect_playlist_provider()
            .returning(|| Err(BridgeError::NotAvailable("no playlists".to_string())));

        let result = resolver_for(client)
            .resolve(ClientId(42), ListKind::Playlist)
            .await;

        assert!(matches!(result, Err(SyncError::UnsupportedCapability { .. })));
    }

    #[tokio::test]
    async fn test_registry_failure_is_remote_error() {
        let mut factory = MockFactory::new();
        factory
            .expect_get_client()
            .returning(|_| Err(BridgeError::OperationFailed("registry offline".to_string())));
        let resolver = ClientResolver::new(Arc::new(factory));

        let result = resolver.resolve(ClientId(1), ListKind::Playlist).await;
        assert!(matches!(result, Err(SyncError::RemoteProvider { .. })));
    }
}
