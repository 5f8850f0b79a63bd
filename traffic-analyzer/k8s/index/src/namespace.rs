use crate::Index;
use ahash::AHashMap as HashMap;
use traffic_analyzer_core::{ClusterSnapshot, Namespace, NetworkPolicy, Pod};
use traffic_analyzer_k8s_api::{self as k8s, Labels, ResourceExt};

#[derive(Debug, Default)]
pub(crate) struct NamespaceIndex {
    pub(crate) index: HashMap<String, NamespaceState>,
}

/// Resources observed within one namespace.
///
/// An entry may exist before its `Namespace` resource has been observed,
/// since pods and policies can arrive first; `labels` stays `None` until it
/// is.
#[derive(Debug, Default)]
pub(crate) struct NamespaceState {
    pub(crate) labels: Option<Labels>,
    pub(crate) pods: HashMap<String, Labels>,
    pub(crate) policies: HashMap<String, NetworkPolicy>,
}

// === impl NamespaceIndex ===

impl NamespaceIndex {
    pub(crate) fn get_or_default(&mut self, name: impl Into<String>) -> &mut NamespaceState {
        self.index.entry(name.into()).or_default()
    }

    /// Drops `name` once nothing references it.
    pub(crate) fn retain_if_used(&mut self, name: &str) {
        if let Some(ns) = self.index.get(name) {
            if ns.is_empty() {
                self.index.remove(name);
            }
        }
    }

    /// Builds an immutable snapshot, ordered by name so downstream analysis
    /// output is deterministic.
    pub(crate) fn snapshot(&self) -> ClusterSnapshot {
        let mut namespaces = Vec::new();
        let mut pods = Vec::new();
        let mut policies = Vec::new();

        for (ns_name, ns) in self.index.iter() {
            if let Some(labels) = &ns.labels {
                namespaces.push(Namespace {
                    name: ns_name.clone(),
                    labels: labels.clone(),
                });
            }
            for (name, labels) in ns.pods.iter() {
                pods.push(Pod {
                    name: name.clone(),
                    namespace: ns_name.clone(),
                    labels: labels.clone(),
                });
            }
            policies.extend(ns.policies.values().cloned());
        }

        namespaces.sort_by(|a, b| a.name.cmp(&b.name));
        pods.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        policies.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

        ClusterSnapshot {
            namespaces,
            pods,
            policies,
        }
    }
}

// === impl NamespaceState ===

impl NamespaceState {
    pub(crate) fn is_empty(&self) -> bool {
        self.labels.is_none() && self.pods.is_empty() && self.policies.is_empty()
    }
}

impl kubert::index::IndexClusterResource<k8s::Namespace> for Index {
    fn apply(&mut self, namespace: k8s::Namespace) {
        let name = namespace.name_unchecked();
        let labels = Labels::from(namespace.metadata.labels);

        let changed = {
            let ns = self.namespaces.get_or_default(name);
            if ns.labels.as_ref() == Some(&labels) {
                false
            } else {
                ns.labels = Some(labels);
                true
            }
        };
        if changed {
            self.publish();
        }
    }

    fn delete(&mut self, name: String) {
        if let Some(ns) = self.namespaces.index.get_mut(&name) {
            ns.labels = None;
            self.namespaces.retain_if_used(&name);
            tracing::debug!(%name, "Removed namespace");
            self.publish();
        }
    }
}
