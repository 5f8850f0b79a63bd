use crate::{
    cluster::{ClusterSnapshot, PodRef},
    isolation::{classify, PodIsolation},
    routes::{match_route, AllowedRoute},
};
use serde::Serialize;

/// The complete output of one analysis pass over one cluster snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficAnalysisResult {
    pub pod_isolations: Vec<PodIsolationStatus>,
    pub allowed_routes: Vec<AllowedRoute>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodIsolationStatus {
    pub pod: PodRef,
    pub is_ingress_isolated: bool,
    pub is_egress_isolated: bool,
}

/// Computes isolation for every pod and the allowed routes between every
/// ordered pod pair.
///
/// A pure function of the snapshot: no state survives between calls. Pods
/// are classified in input order; pairs are visited source-major, and a pod
/// is never paired with itself.
pub fn analyze(snapshot: &ClusterSnapshot) -> TrafficAnalysisResult {
    let isolations: Vec<PodIsolation<'_>> = snapshot
        .pods
        .iter()
        .map(|pod| classify(pod, &snapshot.policies))
        .collect();

    let mut allowed_routes = Vec::new();
    for (src, source) in isolations.iter().enumerate() {
        for (tgt, target) in isolations.iter().enumerate() {
            if src == tgt {
                continue;
            }
            if let Some(r) = match_route(source, target, &snapshot.namespaces) {
                allowed_routes.push(r);
            }
        }
    }

    let pod_isolations = isolations
        .iter()
        .map(|isolation| PodIsolationStatus {
            pod: PodRef::from(isolation.pod),
            is_ingress_isolated: isolation.is_ingress_isolated(),
            is_egress_isolated: isolation.is_egress_isolated(),
        })
        .collect();

    TrafficAnalysisResult {
        pod_isolations,
        allowed_routes,
    }
}
