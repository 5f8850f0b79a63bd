#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod analyzer;
mod cluster;
mod isolation;
mod routes;

pub use self::{
    analyzer::{analyze, PodIsolationStatus, TrafficAnalysisResult},
    cluster::{
        namespace_labels, ClusterSnapshot, Direction, DirectionSet, InvalidDirection, Namespace,
        NetworkPolicy, Peer, Pod, PodRef, PolicyRef, Rule,
    },
    isolation::{classify, PodIsolation},
    routes::AllowedRoute,
};
pub use traffic_analyzer_k8s_api::{
    labels::{Expression, Operator, Selector},
    Labels,
};
