//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for server and desktop hosts
//! (Linux, macOS, Windows).
//!
//! - `HttpClient` using `reqwest`, with retry and exponential backoff
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::try_new()?);
//! let config = CoreConfig::builder().http_client(http_client);
//! ```

mod http;

pub use http::ReqwestHttpClient;
