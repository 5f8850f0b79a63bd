use crate::Index;
use traffic_analyzer_k8s_api::{self as k8s, Labels, ResourceExt};
use tracing::debug;

impl kubert::index::IndexNamespacedResource<k8s::Pod> for Index {
    fn apply(&mut self, pod: k8s::Pod) {
        let namespace = pod.namespace().expect("pod must have a namespace");
        let name = pod.name_unchecked();
        let labels = Labels::from(pod.metadata.labels);

        // Labels are the only pod state analysis consumes, so an update that
        // leaves them unchanged need not republish.
        let changed = {
            let ns = self.namespaces.get_or_default(namespace);
            if ns.pods.get(&name) == Some(&labels) {
                false
            } else {
                debug!(pod = %name, "Applying pod");
                ns.pods.insert(name, labels);
                true
            }
        };
        if changed {
            self.publish();
        }
    }

    fn delete(&mut self, namespace: String, name: String) {
        if let Some(ns) = self.namespaces.index.get_mut(&namespace) {
            if ns.pods.remove(&name).is_some() {
                debug!(%namespace, pod = %name, "Removed pod");
                self.namespaces.retain_if_used(&namespace);
                self.publish();
            }
        }
    }

    // The default `reset` applies and deletes one resource at a time, which
    // publishes a snapshot per change; correctness doesn't depend on
    // batching, so the default suffices.
}
