//! HLS playlist decoding and segment extraction.

use m3u8_rs::{MasterPlaylist, MediaPlaylist, parse_playlist_res};

use super::SegmentCandidate;
use crate::error::{MonitorError, Result};
use crate::resolve::resolve_url;

/// A decoded HLS document.
#[derive(Debug, Clone)]
pub enum HlsPlaylist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

pub fn decode(url: &str, body: &[u8]) -> Result<HlsPlaylist> {
    match parse_playlist_res(body) {
        Ok(m3u8_rs::Playlist::MasterPlaylist(pl)) => Ok(HlsPlaylist::Master(pl)),
        Ok(m3u8_rs::Playlist::MediaPlaylist(pl)) => Ok(HlsPlaylist::Media(pl)),
        Err(e) => Err(MonitorError::decode(
            url,
            format!("failed to parse playlist: {e}"),
        )),
    }
}

/// Every segment of a media playlist, resolved against the playlist's own URL.
pub fn media_segments(playlist: &MediaPlaylist, playlist_url: &str) -> Vec<SegmentCandidate> {
    playlist
        .segments
        .iter()
        .filter(|segment| !segment.uri.is_empty())
        .map(|segment| SegmentCandidate {
            url: resolve_url(playlist_url, &segment.uri),
            duration: f64::from(segment.duration).max(0.0),
        })
        .collect()
}

/// Absolute URL of the first variant listed by a master playlist.
///
/// No bandwidth or codec preference is applied: the first entry wins.
pub fn first_variant_url(playlist: &MasterPlaylist, master_url: &str) -> Result<String> {
    let variant = playlist
        .variants
        .first()
        .ok_or_else(|| MonitorError::NoVariants {
            url: master_url.to_string(),
        })?;
    Ok(resolve_url(master_url, &variant.uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:100
#EXTINF:6.000,
seg100.ts
#EXTINF:5.5,
https://cdn.example.com/abs/seg101.ts
#EXTINF:6.000,
../other/seg102.ts
";

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
high/index.m3u8
";

    #[test]
    fn test_decode_media_playlist() {
        let url = "https://a.com/live/chunklist.m3u8";
        let HlsPlaylist::Media(pl) = decode(url, MEDIA.as_bytes()).unwrap() else {
            panic!("expected media playlist");
        };

        let segments = media_segments(&pl, url);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].url, "https://a.com/live/seg100.ts");
        assert_eq!(segments[0].duration, 6.0);
        assert_eq!(segments[1].url, "https://cdn.example.com/abs/seg101.ts");
        assert_eq!(segments[1].duration, 5.5);
        assert_eq!(segments[2].url, "https://a.com/other/seg102.ts");
    }

    #[test]
    fn test_first_variant_is_selected() {
        let url = "https://a.com/live/master.m3u8";
        let HlsPlaylist::Master(pl) = decode(url, MASTER.as_bytes()).unwrap() else {
            panic!("expected master playlist");
        };

        assert_eq!(
            first_variant_url(&pl, url).unwrap(),
            "https://a.com/live/low/index.m3u8"
        );
    }

    #[test]
    fn test_master_without_variants() {
        let pl = MasterPlaylist::default();
        let err = first_variant_url(&pl, "https://a.com/master.m3u8").unwrap_err();
        assert!(matches!(err, MonitorError::NoVariants { .. }));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode("https://a.com/x.m3u8", b"<html>not a playlist</html>").unwrap_err();
        assert!(matches!(err, MonitorError::Decode { .. }));
    }
}
