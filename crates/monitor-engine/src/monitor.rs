//! Per-session monitoring loop.
//!
//! Each session runs one task that waits for its interval, then resolves the
//! manifest, probes segments it has not seen yet, and merges the results into
//! the session's history. Tick failures are logged and the loop simply tries
//! again on the next interval.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::session::SessionShared;
use crate::tracker::SegmentStatus;

/// Counters describing one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Segments listed by the manifest.
    pub candidates: usize,
    /// Segments that had not been seen and were probed.
    pub probed: usize,
    /// Probes that failed and were skipped.
    pub failed: usize,
    /// Statuses appended to history.
    pub recorded: usize,
}

enum TickOutcome {
    Merged(TickReport),
    /// The session was stopped or replaced while the tick ran.
    Stale,
}

pub(crate) async fn run(
    shared: Arc<SessionShared>,
    session_id: String,
    generation: u64,
    manifest_url: String,
    cancel: CancellationToken,
) {
    let period = shared.config.poll_interval;
    let first_tick = if shared.config.fire_immediately {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(session_id = %session_id, interval = ?period, "Monitoring loop running");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // An in-flight tick is abandoned as soon as the session is cancelled.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = tick(&shared, &session_id, generation, &manifest_url) => outcome,
        };

        match outcome {
            Ok(TickOutcome::Merged(report)) => {
                debug!(
                    session_id = %session_id,
                    candidates = report.candidates,
                    probed = report.probed,
                    failed = report.failed,
                    recorded = report.recorded,
                    "Tick complete"
                );
            }
            Ok(TickOutcome::Stale) => break,
            Err(e) if e.is_fetch_error() => {
                warn!(
                    session_id = %session_id,
                    url = %manifest_url,
                    error = %e,
                    "Manifest unreachable, retrying next interval"
                );
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    url = %manifest_url,
                    error = %e,
                    "Tick failed, retrying next interval"
                );
            }
        }
    }

    info!(session_id = %session_id, "Monitoring loop exited");
}

async fn tick(
    shared: &SessionShared,
    session_id: &str,
    generation: u64,
    manifest_url: &str,
) -> Result<TickOutcome> {
    let candidates = shared.resolver.resolve(manifest_url).await?;
    let total = candidates.len();

    let Some(fresh) = shared.unseen_candidates(session_id, generation, candidates) else {
        return Ok(TickOutcome::Stale);
    };
    let probed = fresh.len();
    let threshold = shared.config.delay_threshold;

    let staged: Vec<SegmentStatus> = stream::iter(fresh)
        .map(|candidate| {
            let prober = Arc::clone(&shared.prober);
            async move {
                match prober.probe(&candidate.url).await {
                    Ok(load_time) => Some(SegmentStatus::new(candidate, load_time, threshold)),
                    Err(e) => {
                        warn!(
                            session_id = %session_id,
                            url = %candidate.url,
                            error = %e,
                            "Segment probe failed, skipping"
                        );
                        None
                    }
                }
            }
        })
        .buffered(shared.config.probe_concurrency)
        .filter_map(|status| async move { status })
        .collect()
        .await;

    let failed = probed - staged.len();
    let Some(recorded) = shared.merge_statuses(session_id, generation, staged) else {
        return Ok(TickOutcome::Stale);
    };

    Ok(TickOutcome::Merged(TickReport {
        candidates: total,
        probed,
        failed,
        recorded,
    }))
}
