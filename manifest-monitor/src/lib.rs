//! manifest-monitor library crate.
//!
//! Wires the monitoring engine to its HTTP surface. Exposed as a library so
//! the router can be exercised from integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{Error, Result};
