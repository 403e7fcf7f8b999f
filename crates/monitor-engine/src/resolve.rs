//! Resolution of manifest-relative URIs.

use tracing::warn;
use url::Url;

use crate::error::{MonitorError, Result};

/// Resolve `reference` against `base` the way a browser resolves a link.
///
/// Absolute references come back unchanged. If either side cannot be parsed
/// the reference is returned as-is so a single odd entry never aborts a tick.
pub fn resolve_url(base: &str, reference: &str) -> String {
    let base_url = match Url::parse(base) {
        Ok(url) => url,
        Err(e) => {
            warn!(base = %base, error = %e, "Failed to parse base URL");
            return reference.to_string();
        }
    };

    match base_url.join(reference) {
        Ok(resolved) => resolved.to_string(),
        Err(e) => {
            warn!(reference = %reference, error = %e, "Failed to resolve relative URL");
            reference.to_string()
        }
    }
}

/// Accept only `http://` and `https://` manifest URLs.
pub fn validate_manifest_url(input: &str) -> Result<()> {
    if input.starts_with("http://") || input.starts_with("https://") {
        Ok(())
    } else {
        Err(MonitorError::invalid_url(
            input,
            "URL must start with http:// or https://",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_segment() {
        assert_eq!(
            resolve_url("https://a.com/b/manifest.m3u8", "seg1.ts"),
            "https://a.com/b/seg1.ts"
        );
    }

    #[test]
    fn test_resolve_absolute_unchanged() {
        assert_eq!(
            resolve_url("https://a.com/b/manifest.m3u8", "https://cdn.example.com/x/seg1.ts"),
            "https://cdn.example.com/x/seg1.ts"
        );
    }

    #[test]
    fn test_resolve_root_and_parent_paths() {
        let base = "https://a.com/b/c/manifest.m3u8";
        assert_eq!(resolve_url(base, "/live/seg.ts"), "https://a.com/live/seg.ts");
        assert_eq!(resolve_url(base, "../seg.ts"), "https://a.com/b/seg.ts");
        assert_eq!(
            resolve_url(base, "seg.ts?token=1"),
            "https://a.com/b/c/seg.ts?token=1"
        );
    }

    #[test]
    fn test_resolve_unparseable_base_returns_reference() {
        assert_eq!(resolve_url("not a url", "seg1.ts"), "seg1.ts");
    }

    #[test]
    fn test_validate_manifest_url() {
        assert!(validate_manifest_url("http://a.com/x.m3u8").is_ok());
        assert!(validate_manifest_url("https://a.com/x.mpd").is_ok());
        assert!(matches!(
            validate_manifest_url("ftp://a.com/x.m3u8"),
            Err(MonitorError::InvalidUrl { .. })
        ));
        assert!(validate_manifest_url("").is_err());
    }
}
