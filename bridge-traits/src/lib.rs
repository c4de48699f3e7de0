//! # Bridge Traits
//!
//! Capability contracts between the list-sync core and the outside world.
//!
//! ## Overview
//!
//! The core never talks to a media server or a host service directly. Each
//! trait in this crate is a seam that a host application or a provider crate
//! fills in:
//!
//! ### Remote clients
//! - [`MediaClient`](clients::MediaClient) - Handle to one configured media server or manager
//! - [`ClientFactory`](clients::ClientFactory) - Resolves client ids to handles
//! - [`ListProvider`](lists::ListProvider) - Remote playlist/collection CRUD
//! - [`ItemIdMapper`](lists::ItemIdMapper) - Canonical item id translation per client
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert their own errors into it and keep the remote cause in the
//! message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind `Arc`.

pub mod clients;
pub mod error;
pub mod http;
pub mod lists;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use clients::{ClientFactory, ClientType, MediaClient};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use lists::{ItemIdMapper, ListProvider, RemoteList, RemoteListItem};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
