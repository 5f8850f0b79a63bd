use crate::core::{ClusterSnapshot, TrafficAnalysisResult};
use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::{Registry, Unit},
};
use std::sync::atomic::AtomicU64;
use tokio::time;

#[derive(Clone, Debug)]
pub(crate) struct AnalysisMetrics {
    runs: Counter,
    duration: Gauge<f64, AtomicU64>,
    namespaces: Gauge,
    pods: Gauge,
    policies: Gauge,
    routes: Gauge,
}

// === impl AnalysisMetrics ===

impl AnalysisMetrics {
    pub(crate) fn register(reg: &mut Registry) -> Self {
        let runs = Counter::default();
        reg.register("runs", "Total number of analysis runs", runs.clone());

        let duration = Gauge::<f64, AtomicU64>::default();
        reg.register_with_unit(
            "last_run_duration",
            "Wall-clock duration of the most recent analysis run",
            Unit::Seconds,
            duration.clone(),
        );

        let namespaces = Gauge::default();
        reg.register(
            "snapshot_namespaces",
            "Number of namespaces in the most recently analyzed snapshot",
            namespaces.clone(),
        );

        let pods = Gauge::default();
        reg.register(
            "snapshot_pods",
            "Number of pods in the most recently analyzed snapshot",
            pods.clone(),
        );

        let policies = Gauge::default();
        reg.register(
            "snapshot_network_policies",
            "Number of network policies in the most recently analyzed snapshot",
            policies.clone(),
        );

        let routes = Gauge::default();
        reg.register(
            "allowed_routes",
            "Number of allowed routes found by the most recent analysis run",
            routes.clone(),
        );

        Self {
            runs,
            duration,
            namespaces,
            pods,
            policies,
            routes,
        }
    }

    pub(crate) fn observe(
        &self,
        snapshot: &ClusterSnapshot,
        analysis: &TrafficAnalysisResult,
        elapsed: time::Duration,
    ) {
        self.runs.inc();
        self.duration.set(elapsed.as_secs_f64());
        self.namespaces.set(snapshot.namespaces.len() as i64);
        self.pods.set(snapshot.pods.len() as i64);
        self.policies.set(snapshot.policies.len() as i64);
        self.routes.set(analysis.allowed_routes.len() as i64);
    }
}
