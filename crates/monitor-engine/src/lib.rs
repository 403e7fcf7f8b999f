//! Session-scoped HLS/DASH manifest monitoring.
//!
//! A [`SessionStore`] owns every monitoring session. Starting a session spawns
//! a loop that periodically resolves the manifest into segment URLs, probes
//! each segment it has not seen before, and keeps a bounded history of
//! [`SegmentStatus`] values that callers can snapshot at any time.

pub mod config;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod monitor;
pub mod resolve;
pub mod session;
pub mod tracker;

pub use config::{ClientConfig, MonitorConfig};
pub use error::{MonitorError, Result};
pub use fetch::{HttpFetcher, ManifestLoader, SegmentProbe};
pub use manifest::{Manifest, ManifestFormat, ManifestResolver, SegmentCandidate};
pub use monitor::TickReport;
pub use resolve::resolve_url;
pub use session::SessionStore;
pub use tracker::{SegmentStatus, SegmentTracker};
