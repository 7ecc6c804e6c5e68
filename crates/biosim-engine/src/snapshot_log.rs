//! Snapshot logger.
//!
//! Consumes the playback's `watch` channel and writes one log line per
//! observed snapshot. With `debug` enabled the full snapshot is attached as
//! JSON, which is the same shape a view layer would receive.

use biosim_types::RenderSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn a task that logs every snapshot until the sender is dropped.
pub fn spawn(mut rx: watch::Receiver<RenderSnapshot>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut observed: u64 = 0;
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            observed = observed.saturating_add(1);
            log_snapshot(&snapshot);
        }
        observed
    })
}

/// Write one snapshot to the log.
pub fn log_snapshot(snapshot: &RenderSnapshot) {
    info!(
        topic = snapshot.topic_id,
        running = snapshot.running,
        completed = snapshot.completed,
        phase = snapshot.phase.label,
        phase_index = snapshot.phase.index,
        phase_count = snapshot.phase_count,
        elapsed_ticks = snapshot.elapsed_ticks,
        counters = %summarize(snapshot),
        "Snapshot"
    );
    match serde_json::to_string(snapshot) {
        Ok(json) => debug!(snapshot = %json, "Snapshot payload"),
        Err(e) => warn!(error = %e, "failed to serialize snapshot"),
    }
}

/// Compact `name=value` listing of counters and derived values.
fn summarize(snapshot: &RenderSnapshot) -> String {
    snapshot
        .counters
        .iter()
        .chain(snapshot.derived.iter())
        .map(|(name, value)| format!("{name}={value:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}
