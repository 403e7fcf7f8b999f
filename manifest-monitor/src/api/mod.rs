//! HTTP surface of the monitor.
//!
//! Exposes session start/stop/query endpoints, a health check, and static
//! asset serving for the dashboard.

pub mod error;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
