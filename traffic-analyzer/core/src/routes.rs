use crate::{
    cluster::{namespace_labels, Namespace, NetworkPolicy, Peer, Pod, PodRef, PolicyRef, Rule},
    isolation::PodIsolation,
};
use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A directional permission for one pod to reach another, annotated with the
/// ports and the policies that jointly permit it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedRoute {
    pub source_pod: PodRef,
    pub target_pod: PodRef,
    pub egress_policies: Vec<PolicyRef>,
    pub ingress_policies: Vec<PolicyRef>,

    /// `None` means any port is allowed.
    pub ports: Option<Vec<u16>>,
}

/// A port bucket key: a concrete port, or the wildcard meaning "no port
/// restriction".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum PortKey {
    Any,
    Number(u16),
}

type PortTable<'a> = HashMap<PortKey, Vec<&'a NetworkPolicy>>;

/// Decides whether traffic from `source` to `target` is allowed, and on
/// which ports.
///
/// The target's ingress policies and the source's egress policies each yield
/// a table of port buckets; a route exists when the tables agree on at least
/// one port, or when both sides are unrestricted. A concrete port on one side
/// wins over the other side's wildcard so the output reports the binding
/// constraint. Absence of a route is a normal outcome, not an error.
pub(crate) fn match_route<'a>(
    source: &PodIsolation<'a>,
    target: &PodIsolation<'a>,
    namespaces: &[Namespace],
) -> Option<AllowedRoute> {
    let ingress = port_table(
        &target.ingress_policies,
        |policy| &policy.ingress,
        source.pod,
        namespaces,
    );
    let egress = port_table(
        &source.egress_policies,
        |policy| &policy.egress,
        target.pod,
        namespaces,
    );

    let mut unrestricted = false;
    let mut ports = BTreeSet::new();
    let mut ingress_refs = BTreeMap::new();
    let mut egress_refs = BTreeMap::new();

    for (ingress_key, ingress_policies) in ingress.iter() {
        for (egress_key, egress_policies) in egress.iter() {
            let resolved = match (*ingress_key, *egress_key) {
                (PortKey::Any, key) => key,
                (key, PortKey::Any) => key,
                (PortKey::Number(i), PortKey::Number(e)) if i == e => PortKey::Number(i),
                _ => continue,
            };

            match resolved {
                PortKey::Any => unrestricted = true,
                PortKey::Number(port) => {
                    ports.insert(port);
                }
            }

            collect_refs(&mut ingress_refs, ingress_policies);
            collect_refs(&mut egress_refs, egress_policies);
        }
    }

    // No overlapping port and neither side unrestricted: the directions'
    // requirements are incompatible and no traffic flows.
    if !unrestricted && ports.is_empty() {
        return None;
    }

    Some(AllowedRoute {
        source_pod: PodRef::from(source.pod),
        target_pod: PodRef::from(target.pod),
        egress_policies: egress_refs.into_values().collect(),
        ingress_policies: ingress_refs.into_values().collect(),
        ports: if unrestricted {
            None
        } else {
            Some(ports.into_iter().collect())
        },
    })
}

/// Buckets the policies that admit `peer_pod` by the ports their rules allow.
///
/// A pod that is not isolated in this direction yields a single wildcard
/// bucket with no contributing policy: everything is allowed, with no policy
/// to cite.
fn port_table<'a>(
    policies: &[&'a NetworkPolicy],
    rules: impl Fn(&'a NetworkPolicy) -> &'a [Rule],
    peer_pod: &Pod,
    namespaces: &[Namespace],
) -> PortTable<'a> {
    let mut table = PortTable::default();

    if policies.is_empty() {
        table.insert(PortKey::Any, Vec::new());
        return table;
    }

    for policy in policies.iter().copied() {
        for rule in rules(policy) {
            if !rule
                .peers
                .iter()
                .any(|peer| peer_matches(peer, peer_pod, namespaces))
            {
                continue;
            }
            match rule.ports.as_deref() {
                None => table.entry(PortKey::Any).or_default().push(policy),
                Some(ports) => {
                    for port in ports {
                        table.entry(PortKey::Number(*port)).or_default().push(policy);
                    }
                }
            }
        }
    }

    table
}

/// Whether a rule's peer admits `pod`. Selectors that are present must both
/// be satisfied; an absent selector imposes no constraint.
fn peer_matches(peer: &Peer, pod: &Pod, namespaces: &[Namespace]) -> bool {
    if let Some(selector) = &peer.pod_selector {
        if !selector.matches(&pod.labels) {
            return false;
        }
    }

    if let Some(selector) = &peer.namespace_selector {
        if !selector.matches(&namespace_labels(namespaces, &pod.namespace)) {
            return false;
        }
    }

    true
}

/// Accumulates policies by `(namespace, name)` so a policy contributing
/// through several port buckets appears once in the route.
fn collect_refs(refs: &mut BTreeMap<(String, String), PolicyRef>, policies: &[&NetworkPolicy]) {
    for policy in policies {
        refs.entry((policy.namespace.clone(), policy.name.clone()))
            .or_insert_with(|| PolicyRef::from(*policy));
    }
}
