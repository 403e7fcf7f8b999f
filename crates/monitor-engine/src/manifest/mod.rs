//! Manifest retrieval and resolution into concrete segment lists.
//!
//! A manifest URL is dispatched by its path suffix (`.m3u8` or `.mpd`),
//! fetched through a [`ManifestLoader`], decoded into a [`Manifest`], and
//! flattened into [`SegmentCandidate`]s with absolute URLs. HLS master
//! playlists are followed through their first variant until a media playlist
//! is reached.

pub mod dash;
pub mod hls;

use std::sync::Arc;

use dash_mpd::MPD;
use m3u8_rs::{MasterPlaylist, MediaPlaylist};
use tracing::debug;
use url::Url;

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::fetch::ManifestLoader;

/// A segment announced by a manifest, not yet probed.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCandidate {
    /// Absolute segment URL.
    pub url: String,
    /// Declared duration in seconds, zero when the manifest does not say.
    pub duration: f64,
}

/// Manifest family, chosen from the URL before anything is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Hls,
    Dash,
}

impl ManifestFormat {
    /// Detect the format from the URL path, ignoring query and fragment.
    pub fn detect(manifest_url: &str) -> Result<Self> {
        let path = match Url::parse(manifest_url) {
            Ok(url) => url.path().to_ascii_lowercase(),
            Err(_) => manifest_url.to_ascii_lowercase(),
        };

        if path.ends_with(".m3u8") {
            Ok(Self::Hls)
        } else if path.ends_with(".mpd") {
            Ok(Self::Dash)
        } else {
            Err(MonitorError::unsupported_manifest(manifest_url))
        }
    }
}

/// A decoded manifest document.
#[derive(Debug, Clone)]
pub enum Manifest {
    Media(MediaPlaylist),
    Master(MasterPlaylist),
    Dash(Box<MPD>),
}

impl Manifest {
    pub fn decode(format: ManifestFormat, url: &str, body: &[u8]) -> Result<Self> {
        match format {
            ManifestFormat::Hls => Ok(match hls::decode(url, body)? {
                hls::HlsPlaylist::Media(pl) => Self::Media(pl),
                hls::HlsPlaylist::Master(pl) => Self::Master(pl),
            }),
            ManifestFormat::Dash => Ok(Self::Dash(Box::new(dash::decode(url, body)?))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Media(_) => "hls-media",
            Self::Master(_) => "hls-master",
            Self::Dash(_) => "dash",
        }
    }
}

/// Turns a manifest URL into the list of segments it currently announces.
#[derive(Clone)]
pub struct ManifestResolver {
    loader: Arc<dyn ManifestLoader>,
    dash_segment_count: usize,
    max_variant_depth: usize,
}

impl ManifestResolver {
    pub fn new(loader: Arc<dyn ManifestLoader>, config: &MonitorConfig) -> Self {
        Self {
            loader,
            dash_segment_count: config.dash_segment_count,
            max_variant_depth: config.max_variant_depth,
        }
    }

    /// Fetch and decode `manifest_url`, following master playlists, and
    /// return every segment it lists in manifest order.
    pub async fn resolve(&self, manifest_url: &str) -> Result<Vec<SegmentCandidate>> {
        let format = ManifestFormat::detect(manifest_url)?;
        let mut current_url = manifest_url.to_string();

        // Variant URIs are decoded as HLS whatever their suffix, so the
        // format is only detected once for the top-level URL.
        for depth in 0..=self.max_variant_depth {
            let body = self.loader.load(&current_url).await?;
            let manifest = Manifest::decode(format, &current_url, &body)?;
            debug!(url = %current_url, kind = manifest.kind(), depth, "Decoded manifest");

            match manifest {
                Manifest::Media(playlist) => {
                    return Ok(hls::media_segments(&playlist, &current_url));
                }
                Manifest::Master(playlist) => {
                    debug!(variants = playlist.variants.len(), "Parsed master playlist");
                    current_url = hls::first_variant_url(&playlist, &current_url)?;
                }
                Manifest::Dash(mpd) => {
                    return Ok(dash::template_segments(
                        &mpd,
                        &current_url,
                        self.dash_segment_count,
                    ));
                }
            }
        }

        Err(MonitorError::VariantDepthExceeded {
            url: manifest_url.to_string(),
            depth: self.max_variant_depth,
        })
    }
}
