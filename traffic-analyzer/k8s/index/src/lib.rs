//! Ingests the cluster state consumed by traffic analysis.
//!
//! The index watches three resource kinds:
//!
//! - `Namespace`, for the labels evaluated by `namespaceSelector` peers;
//! - `Pod`, for workload identity and labels;
//! - `NetworkPolicy`, reduced to the core model at apply time.
//!
//! Raw Kubernetes objects are never retained. Every resource is converted as
//! it is applied, so malformed selectors, CIDR-only peers and named ports are
//! neutralized here, once, instead of on every analysis pass.
//!
//! After every change the index publishes a complete [`ClusterSnapshot`] on a
//! watch channel. The channel only retains the most recent snapshot, so a
//! burst of events collapses into however many snapshots the consumer
//! actually observes; the analysis worker never falls behind a backlog.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod namespace;
mod network_policy;
mod pod;


use self::namespace::NamespaceIndex;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use traffic_analyzer_core::ClusterSnapshot;

pub type SharedIndex = Arc<RwLock<Index>>;

/// Receives each newly published cluster snapshot.
pub type SnapshotRx = watch::Receiver<ClusterSnapshot>;

/// Holds all indexing state. Owned and updated by the tasks processing watch
/// events; consumers follow the snapshot channel rather than reading the
/// index directly.
#[derive(Debug)]
pub struct Index {
    namespaces: NamespaceIndex,
    snapshots: watch::Sender<ClusterSnapshot>,
}

// === impl Index ===

impl Index {
    pub fn shared() -> (SharedIndex, SnapshotRx) {
        let (snapshots, rx) = watch::channel(ClusterSnapshot::default());
        let index = Self {
            namespaces: NamespaceIndex::default(),
            snapshots,
        };
        (Arc::new(RwLock::new(index)), rx)
    }

    /// Rebuilds and publishes the snapshot after a change.
    fn publish(&mut self) {
        self.snapshots.send_replace(self.namespaces.snapshot());
    }
}
