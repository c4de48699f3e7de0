//! Jellyfin API connector
//!
//! Thin typed wrapper over the playlist endpoints. Canonical item ids never
//! reach this layer; it speaks Jellyfin ids only.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{JellyfinError, Result};
use crate::types::{
    BaseItemDto, CreatePlaylistRequest, PlaylistCreationResult, PlaylistDto, UpdatePlaylistRequest,
};

/// Header carrying the API key
const TOKEN_HEADER: &str = "X-Emby-Token";

/// Connection settings for one Jellyfin server
#[derive(Clone)]
pub struct JellyfinConfig {
    /// Id the host registered this client under
    pub client_id: u64,

    /// Server root, e.g. `https://media.example.com`
    pub base_url: String,

    pub api_key: String,

    /// Jellyfin user that owns created playlists
    pub user_id: String,

    /// Media type sent on playlist creation
    pub media_type: Option<String>,

    /// Turns the playlist capability off without removing the client
    pub playlists_enabled: bool,

    pub request_timeout: Duration,
}

impl std::fmt::Debug for JellyfinConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JellyfinConfig")
            .field("client_id", &self.client_id)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("media_type", &self.media_type)
            .field("playlists_enabled", &self.playlists_enabled)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl JellyfinConfig {
    pub fn new(
        client_id: u64,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id,
            base_url: base_url.into(),
            api_key: api_key.into(),
            user_id: user_id.into(),
            media_type: Some("Audio".to_string()),
            playlists_enabled: true,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_media_type(mut self, media_type: Option<String>) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn with_playlists_enabled(mut self, enabled: bool) -> Self {
        self.playlists_enabled = enabled;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(JellyfinError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.api_key.is_empty() {
            return Err(JellyfinError::InvalidConfig(
                "api_key must not be empty".to_string(),
            ));
        }

        if self.user_id.is_empty() {
            return Err(JellyfinError::InvalidConfig(
                "user_id must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Jellyfin playlist API connector
///
/// # Example
///
/// ```ignore
/// use provider_jellyfin::{JellyfinConfig, JellyfinConnector};
///
/// let config = JellyfinConfig::new(42, "https://media.example.com", api_key, user_id);
/// let connector = JellyfinConnector::new(http_client, config)?;
/// let id = connector.create_playlist("Road trip", vec!["a1".into()], false).await?;
/// ```
pub struct JellyfinConnector {
    http_client: Arc<dyn HttpClient>,
    config: JellyfinConfig,
}

impl JellyfinConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, config: JellyfinConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &JellyfinConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.url(path))
            .header(TOKEN_HEADER, self.config.api_key.clone())
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout)
    }

    /// Send and classify the response status
    async fn send(&self, request: HttpRequest, resource: &str) -> Result<HttpResponse> {
        let response = self.http_client.execute(request).await?;

        match response.status {
            status if (200..300).contains(&status) => {
                debug!(status, "Jellyfin request succeeded");
                Ok(response)
            }
            401 | 403 => {
                warn!(status = response.status, "Jellyfin rejected the API key");
                Err(JellyfinError::AuthenticationFailed(format!(
                    "status {}",
                    response.status
                )))
            }
            404 => Err(JellyfinError::NotFound {
                resource: resource.to_string(),
            }),
            status => {
                warn!(status, "Jellyfin request failed");
                Err(JellyfinError::ApiError {
                    status_code: status,
                    message: String::from_utf8_lossy(&response.body).to_string(),
                })
            }
        }
    }

    fn parse<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| JellyfinError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }

    /// `POST /Playlists`. Returns the new playlist id.
    #[instrument(skip(self, item_ids), fields(item_count = item_ids.len()))]
    pub async fn create_playlist(
        &self,
        name: &str,
        item_ids: Vec<String>,
        is_public: bool,
    ) -> Result<String> {
        let body = CreatePlaylistRequest {
            name: name.to_string(),
            ids: item_ids,
            user_id: self.config.user_id.clone(),
            media_type: self.config.media_type.clone(),
            is_public,
        };
        let request = self.request(HttpMethod::Post, "/Playlists").json(&body)?;

        let response = self.send(request, "playlists").await?;
        let created: PlaylistCreationResult = Self::parse(&response, "playlist creation result")?;
        Ok(created.id)
    }

    /// `POST /Playlists/{id}`, replacing name, visibility and items
    #[instrument(skip(self, item_ids), fields(item_count = item_ids.len()))]
    pub async fn update_playlist(
        &self,
        playlist_id: &str,
        name: &str,
        item_ids: Vec<String>,
        is_public: bool,
    ) -> Result<()> {
        let body = UpdatePlaylistRequest {
            name: name.to_string(),
            ids: item_ids,
            is_public,
        };
        let path = format!("/Playlists/{}", urlencoding::encode(playlist_id));
        let request = self.request(HttpMethod::Post, &path).json(&body)?;

        self.send(request, &format!("playlist {}", playlist_id))
            .await?;
        Ok(())
    }

    /// `GET /Playlists/{id}`
    #[instrument(skip(self))]
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistDto> {
        let path = format!("/Playlists/{}", urlencoding::encode(playlist_id));
        let response = self
            .send(
                self.request(HttpMethod::Get, &path),
                &format!("playlist {}", playlist_id),
            )
            .await?;
        Self::parse(&response, "playlist")
    }

    /// `GET /Items/{id}?userId=...`, used for a playlist's name and overview
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: &str) -> Result<BaseItemDto> {
        let path = format!(
            "/Items/{}?userId={}",
            urlencoding::encode(item_id),
            urlencoding::encode(&self.config.user_id)
        );
        let response = self
            .send(
                self.request(HttpMethod::Get, &path),
                &format!("item {}", item_id),
            )
            .await?;
        Self::parse(&response, "item")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::RetryPolicy;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        pub HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn execute_with_retry(&self, request: HttpRequest, policy: RetryPolicy) -> BridgeResult<HttpResponse>;
            async fn is_connected(&self) -> bool;
        }
    }

    pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    pub(crate) fn config() -> JellyfinConfig {
        JellyfinConfig::new(42, "https://media.example.com/", "secret-key", "user-1")
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let mut bad_url = config();
        bad_url.base_url = "media.example.com".to_string();
        assert!(matches!(
            bad_url.validate(),
            Err(JellyfinError::InvalidConfig(_))
        ));

        let mut no_key = config();
        no_key.api_key.clear();
        assert!(no_key.validate().is_err());
    }

    #[test]
    fn test_config_debug_hides_api_key() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_create_playlist_request_shape() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(req.url, "https://media.example.com/Playlists");
            assert_eq!(req.headers.get(TOKEN_HEADER), Some(&"secret-key".to_string()));

            let body: serde_json::Value =
                serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["Name"], "Road trip");
            assert_eq!(body["Ids"], serde_json::json!(["a1", "b2"]));
            assert_eq!(body["UserId"], "user-1");
            assert_eq!(body["MediaType"], "Audio");

            Ok(response(200, r#"{"Id": "pl-9"}"#))
        });

        let connector = JellyfinConnector::new(Arc::new(http), config()).unwrap();
        let id = connector
            .create_playlist("Road trip", vec!["a1".to_string(), "b2".to_string()], false)
            .await
            .unwrap();

        assert_eq!(id, "pl-9");
    }

    #[tokio::test]
    async fn test_status_classification() {
        for (status, check) in [
            (401u16, "auth"),
            (404, "missing"),
            (500, "api"),
        ] {
            let mut http = MockHttpClient::new();
            http.expect_execute()
                .returning(move |_| Ok(response(status, "nope")));
            let connector = JellyfinConnector::new(Arc::new(http), config()).unwrap();

            let result = connector.get_playlist("pl-1").await;
            match (check, result) {
                ("auth", Err(JellyfinError::AuthenticationFailed(_))) => {}
                ("missing", Err(JellyfinError::NotFound { resource })) => {
                    assert_eq!(resource, "playlist pl-1")
                }
                ("api", Err(JellyfinError::ApiError { status_code, .. })) => {
                    assert_eq!(status_code, 500)
                }
                (check, other) => panic!("{}: unexpected {:?}", check, other),
            }
        }
    }

    #[tokio::test]
    async fn test_get_item_passes_user() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Get);
            assert_eq!(req.url, "https://media.example.com/Items/pl-1?userId=user-1");
            Ok(response(200, r#"{"Id": "pl-1", "Name": "Mix", "Overview": "weekend"}"#))
        });

        let connector = JellyfinConnector::new(Arc::new(http), config()).unwrap();
        let item = connector.get_item("pl-1").await.unwrap();

        assert_eq!(item.name, "Mix");
        assert_eq!(item.overview.as_deref(), Some("weekend"));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(200, "<html>")));

        let connector = JellyfinConnector::new(Arc::new(http), config()).unwrap();
        let result = connector.get_playlist("pl-1").await;

        assert!(matches!(result, Err(JellyfinError::ParseError(_))));
    }
}
