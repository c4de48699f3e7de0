//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the list sync core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Other crates depend on this one for their logging conventions and for
//! broadcasting sync outcomes to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
