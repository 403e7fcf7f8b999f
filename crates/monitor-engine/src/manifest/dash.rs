//! DASH MPD decoding and SegmentTemplate expansion.

use dash_mpd::{BaseURL, MPD, SegmentTemplate};
use tracing::debug;

use super::SegmentCandidate;
use crate::error::{MonitorError, Result};
use crate::resolve::resolve_url;

pub fn decode(url: &str, body: &[u8]) -> Result<MPD> {
    let text = std::str::from_utf8(body)
        .map_err(|e| MonitorError::decode(url, format!("MPD is not valid UTF-8: {e}")))?;
    dash_mpd::parse(text).map_err(|e| MonitorError::decode(url, format!("failed to parse MPD: {e}")))
}

/// Synthesize `count` segment URLs for every representation that carries a
/// SegmentTemplate with both `initialization` and `media` set.
///
/// Representations without a usable template are skipped. Durations are not
/// derived from the template and are reported as zero.
pub fn template_segments(mpd: &MPD, manifest_url: &str, count: usize) -> Vec<SegmentCandidate> {
    let mut candidates = Vec::new();
    let mpd_base = apply_base_urls(manifest_url, &mpd.base_url);

    for period in &mpd.periods {
        let period_base = apply_base_urls(&mpd_base, &period.BaseURL);
        for adaptation in &period.adaptations {
            let adaptation_base = apply_base_urls(&period_base, &adaptation.BaseURL);
            for representation in &adaptation.representations {
                let template = representation
                    .SegmentTemplate
                    .as_ref()
                    .or(adaptation.SegmentTemplate.as_ref());
                let Some((initialization, media)) = template.and_then(usable_template) else {
                    continue;
                };

                let base = apply_base_urls(&adaptation_base, &representation.BaseURL);
                let representation_id = representation.id.as_deref().unwrap_or_default();

                let init_url = resolve_url(
                    &base,
                    &expand_template(initialization, representation_id, None),
                );
                debug!(
                    representation = %representation_id,
                    init_url = %init_url,
                    "Resolved initialization segment"
                );

                candidates.extend((1..=count).map(|number| SegmentCandidate {
                    url: resolve_url(&base, &expand_template(media, representation_id, Some(number))),
                    duration: 0.0,
                }));
            }
        }
    }

    candidates
}

fn usable_template(template: &SegmentTemplate) -> Option<(&str, &str)> {
    match (&template.initialization, &template.media) {
        (Some(initialization), Some(media)) => Some((initialization.as_str(), media.as_str())),
        _ => None,
    }
}

fn apply_base_urls(base: &str, base_urls: &[BaseURL]) -> String {
    base_urls
        .iter()
        .fold(base.to_string(), |current, base_url| resolve_url(&current, &base_url.base))
}

fn expand_template(template: &str, representation_id: &str, number: Option<usize>) -> String {
    let expanded = template.replace("$RepresentationID$", representation_id);
    match number {
        Some(number) => expanded.replace("$Number$", &number.to_string()),
        None => expanded,
    }
}
