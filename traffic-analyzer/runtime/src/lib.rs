#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use traffic_analyzer_core as core;
pub use traffic_analyzer_k8s_api as k8s;
pub use traffic_analyzer_k8s_index as index;

mod api;
mod args;
mod metrics;

pub use self::args::Args;

use self::metrics::AnalysisMetrics;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::time;
use tracing::{debug, info};

/// The most recent analysis, shared between the analysis loop and the API
/// server.
pub(crate) type SharedResult = Arc<RwLock<core::TrafficAnalysisResult>>;

/// Re-analyzes the cluster whenever the indexers publish a new snapshot.
///
/// Snapshots arrive over a watch channel, so bursts of updates coalesce: only
/// the latest snapshot is analyzed once the previous run completes.
async fn analyze(mut snapshots: index::SnapshotRx, results: SharedResult, metrics: AnalysisMetrics) {
    loop {
        let snapshot = snapshots.borrow_and_update().clone();

        let start = time::Instant::now();
        let analysis = core::analyze(&snapshot);
        let elapsed = start.elapsed();

        metrics.observe(&snapshot, &analysis, elapsed);
        info!(
            namespaces = snapshot.namespaces.len(),
            pods = snapshot.pods.len(),
            policies = snapshot.policies.len(),
            routes = analysis.allowed_routes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Analysis complete",
        );
        *results.write() = analysis;

        if snapshots.changed().await.is_err() {
            debug!("Snapshot channel closed");
            return;
        }
    }
}
