use crate::cluster::{Direction, NetworkPolicy, Pod};

/// The policies governing a single pod, split by declared direction.
#[derive(Clone, Debug)]
pub struct PodIsolation<'a> {
    pub pod: &'a Pod,
    pub ingress_policies: Vec<&'a NetworkPolicy>,
    pub egress_policies: Vec<&'a NetworkPolicy>,
}

impl PodIsolation<'_> {
    pub fn is_ingress_isolated(&self) -> bool {
        !self.ingress_policies.is_empty()
    }

    pub fn is_egress_isolated(&self) -> bool {
        !self.egress_policies.is_empty()
    }
}

/// Partitions the policies that select `pod` by declared direction.
///
/// A policy governs a pod only when it lives in the pod's namespace and its
/// pod selector matches the pod's labels; the namespace binding is strict
/// equality, never selector-based. A matched policy lands in the ingress
/// and/or egress list according to its declared directions, preserving the
/// input order.
pub fn classify<'a>(pod: &'a Pod, policies: &'a [NetworkPolicy]) -> PodIsolation<'a> {
    let mut ingress_policies = Vec::new();
    let mut egress_policies = Vec::new();

    for policy in policies {
        if policy.namespace != pod.namespace || !policy.pod_selector.matches(&pod.labels) {
            continue;
        }
        if policy.directions.contains(Direction::Ingress) {
            ingress_policies.push(policy);
        }
        if policy.directions.contains(Direction::Egress) {
            egress_policies.push(policy);
        }
    }

    PodIsolation {
        pod,
        ingress_policies,
        egress_policies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::DirectionSet;
    use crate::Selector;

    fn mk_pod(ns: &str, name: &str, labels: &[(&'static str, &'static str)]) -> Pod {
        Pod {
            name: name.to_string(),
            namespace: ns.to_string(),
            labels: labels.iter().copied().collect(),
        }
    }

    fn mk_policy(ns: &str, name: &str, selector: Selector, directions: DirectionSet) -> NetworkPolicy {
        NetworkPolicy {
            name: name.to_string(),
            namespace: ns.to_string(),
            labels: Default::default(),
            pod_selector: selector,
            directions,
            ingress: vec![],
            egress: vec![],
        }
    }

    const BOTH: DirectionSet = DirectionSet {
        ingress: true,
        egress: true,
    };
    const INGRESS: DirectionSet = DirectionSet {
        ingress: true,
        egress: false,
    };
    const EGRESS: DirectionSet = DirectionSet {
        ingress: false,
        egress: true,
    };

    #[test]
    fn no_policies_means_fully_open() {
        let pod = mk_pod("ns-0", "pod-0", &[("app", "web")]);
        let isolation = classify(&pod, &[]);
        assert!(!isolation.is_ingress_isolated());
        assert!(!isolation.is_egress_isolated());
    }

    #[test]
    fn namespace_must_match_exactly() {
        let pod = mk_pod("ns-0", "pod-0", &[("app", "web")]);
        let policies = vec![mk_policy("ns-1", "deny", Selector::default(), BOTH)];
        let isolation = classify(&pod, &policies);
        assert!(!isolation.is_ingress_isolated());
        assert!(!isolation.is_egress_isolated());
    }

    #[test]
    fn pod_selector_must_match() {
        let pod = mk_pod("ns-0", "pod-0", &[("app", "web")]);
        let policies = vec![
            mk_policy(
                "ns-0",
                "matching",
                Some(("app", "web")).into_iter().collect(),
                INGRESS,
            ),
            mk_policy(
                "ns-0",
                "other",
                Some(("app", "db")).into_iter().collect(),
                INGRESS,
            ),
        ];
        let isolation = classify(&pod, &policies);
        assert_eq!(
            isolation
                .ingress_policies
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>(),
            vec!["matching"]
        );
    }

    #[test]
    fn directions_are_independent() {
        let pod = mk_pod("ns-0", "pod-0", &[]);
        let policies = vec![
            mk_policy("ns-0", "ingress-only", Selector::default(), INGRESS),
            mk_policy("ns-0", "egress-only", Selector::default(), EGRESS),
            mk_policy("ns-0", "both", Selector::default(), BOTH),
            mk_policy("ns-0", "neither", Selector::default(), DirectionSet::default()),
        ];
        let isolation = classify(&pod, &policies);

        let names = |ps: &[&NetworkPolicy]| {
            ps.iter().map(|p| p.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&isolation.ingress_policies), vec!["ingress-only", "both"]);
        assert_eq!(names(&isolation.egress_policies), vec!["egress-only", "both"]);
    }

    #[test]
    fn toggling_egress_does_not_change_ingress_isolation() {
        let pod = mk_pod("ns-0", "pod-0", &[]);
        let without = vec![mk_policy("ns-0", "p", Selector::default(), INGRESS)];
        let with = vec![mk_policy("ns-0", "p", Selector::default(), BOTH)];
        assert_eq!(
            classify(&pod, &without).is_ingress_isolated(),
            classify(&pod, &with).is_ingress_isolated(),
        );
    }
}
