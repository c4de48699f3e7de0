//! # Core Configuration
//!
//! Runtime configuration for the list sync core. Hosts build a [`CoreConfig`]
//! through [`CoreConfigBuilder`], injecting the capabilities the core cannot
//! provide on its own (most importantly the [`ClientFactory`] that knows the
//! configured media clients).
//!
//! Validation is fail-fast: `build()` rejects a configuration with a message
//! that says what to inject or change.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/listsync/lists.db")
//!     .client_factory(Arc::new(MyClientFactory::new()))
//!     .remote_call_timeout(Duration::from_secs(15))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::{ClientFactory, Clock, HttpClient, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for a single remote provider call
pub const DEFAULT_REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest accepted remote call timeout
pub const MAX_REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Validated core configuration
#[derive(Clone)]
pub struct CoreConfig {
    /// SQLite database file for the canonical list store
    pub database_path: PathBuf,

    /// Resolves client ids to configured media clients
    pub client_factory: Arc<dyn ClientFactory>,

    /// HTTP client handed to provider crates. Defaults to the reqwest client
    /// when the `desktop-shims` feature is enabled.
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Time source for every timestamp the engine writes
    pub clock: Arc<dyn Clock>,

    /// Per-call bound on remote provider calls
    pub remote_call_timeout: Duration,

    pub event_buffer_size: usize,

    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("client_factory", &"ClientFactory { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("remote_call_timeout", &self.remote_call_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("logging", &self.logging)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Check value ranges. Called by `build()`; hosts that mutate a config
    /// afterwards can call it again.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.remote_call_timeout.is_zero() {
            return Err(Error::Config(
                "Remote call timeout must be greater than zero".to_string(),
            ));
        }

        if self.remote_call_timeout > MAX_REMOTE_CALL_TIMEOUT {
            return Err(Error::Config(format!(
                "Remote call timeout exceeds maximum of {} seconds",
                MAX_REMOTE_CALL_TIMEOUT.as_secs()
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn client_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ClientFactory".to_string(),
        message: "A ClientFactory is required to resolve media clients by id. \
                  Inject the host's client registry with `.client_factory(...)`."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::try_new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(Some(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Option<Arc<dyn HttpClient>>> {
    Ok(None)
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    client_factory: Option<Arc<dyn ClientFactory>>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    remote_call_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn remote_call_timeout(mut self, timeout: Duration) -> Self {
        self.remote_call_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the database path is missing or a value is out
    ///   of range
    /// - `Error::CapabilityMissing` when no `ClientFactory` was injected
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config(
                "Database path is required. Call `.database_path(...)` on the builder."
                    .to_string(),
            )
        })?;

        let client_factory = self.client_factory.ok_or_else(client_factory_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => Some(client),
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            database_path,
            client_factory,
            http_client,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            remote_call_timeout: self
                .remote_call_timeout
                .unwrap_or(DEFAULT_REMOTE_CALL_TIMEOUT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ManualClock, MediaClient};
    use chrono::{TimeZone, Utc};

    struct EmptyFactory;

    #[async_trait]
    impl ClientFactory for EmptyFactory {
        async fn get_client(&self, _client_id: u64) -> BridgeResult<Option<Arc<dyn MediaClient>>> {
            Ok(None)
        }
    }

    fn factory() -> Arc<dyn ClientFactory> {
        Arc::new(EmptyFactory)
    }

    #[test]
    fn test_builder_with_defaults() {
        let config = CoreConfig::builder()
            .database_path("/tmp/lists.db")
            .client_factory(factory())
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/lists.db"));
        assert_eq!(config.remote_call_timeout, DEFAULT_REMOTE_CALL_TIMEOUT);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        #[cfg(not(feature = "desktop-shims"))]
        assert!(config.http_client.is_none());
        #[cfg(feature = "desktop-shims")]
        assert!(config.http_client.is_some());
    }

    #[test]
    fn test_builder_with_overrides() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = CoreConfig::builder()
            .database_path("lists.db")
            .client_factory(factory())
            .clock(Arc::new(ManualClock::new(start)))
            .remote_call_timeout(Duration::from_secs(5))
            .event_buffer_size(16)
            .build()
            .unwrap();

        assert_eq!(config.clock.now(), start);
        assert_eq!(config.remote_call_timeout, Duration::from_secs(5));
        assert_eq!(config.event_buffer_size, 16);
    }

    #[test]
    fn test_missing_database_path() {
        let result = CoreConfig::builder().client_factory(factory()).build();

        match result {
            Err(Error::Config(message)) => assert!(message.contains("database_path")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_client_factory() {
        let result = CoreConfig::builder().database_path("lists.db").build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "ClientFactory")
            }
            other => panic!("expected missing capability, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_timeout_bounds() {
        for timeout in [Duration::ZERO, Duration::from_secs(601)] {
            let result = CoreConfig::builder()
                .database_path("lists.db")
                .client_factory(factory())
                .remote_call_timeout(timeout)
                .build();
            assert!(matches!(result, Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        let result = CoreConfig::builder()
            .database_path("lists.db")
            .client_factory(factory())
            .event_buffer_size(0)
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
