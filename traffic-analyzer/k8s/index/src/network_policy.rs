use crate::Index;
use traffic_analyzer_core::{Direction, DirectionSet, NetworkPolicy, Peer, Rule, Selector};
use traffic_analyzer_k8s_api::{self as k8s, Labels, ResourceExt};
use tracing::{debug, info, warn};

impl kubert::index::IndexNamespacedResource<k8s::NetworkPolicy> for Index {
    fn apply(&mut self, policy: k8s::NetworkPolicy) {
        let namespace = policy.namespace().expect("policy must have a namespace");
        let name = policy.name_unchecked();
        let policy = mk_network_policy(namespace.clone(), name.clone(), policy);

        let changed = {
            let ns = self.namespaces.get_or_default(namespace);
            if ns.policies.get(&name) == Some(&policy) {
                false
            } else {
                debug!(policy = %name, "Applying network policy");
                ns.policies.insert(name, policy);
                true
            }
        };
        if changed {
            self.publish();
        }
    }

    fn delete(&mut self, namespace: String, name: String) {
        if let Some(ns) = self.namespaces.index.get_mut(&namespace) {
            if ns.policies.remove(&name).is_some() {
                debug!(%namespace, policy = %name, "Removed network policy");
                self.namespaces.retain_if_used(&namespace);
                self.publish();
            }
        }
    }
}

/// Reduces a raw `NetworkPolicy` to the core model.
///
/// This conversion never fails: anything that cannot be interpreted is
/// neutralized in the direction that admits less traffic, and the rest of the
/// policy still takes effect.
fn mk_network_policy(namespace: String, name: String, policy: k8s::NetworkPolicy) -> NetworkPolicy {
    let labels = Labels::from(policy.metadata.labels);
    let spec = policy.spec.unwrap_or_default();

    // Absent `policyTypes` means the policy declares no direction at all;
    // no Ingress default is assumed.
    let directions = spec
        .policy_types
        .into_iter()
        .flatten()
        .filter_map(|t| match t.parse::<Direction>() {
            Ok(direction) => Some(direction),
            Err(error) => {
                warn!(%namespace, policy = %name, %error, "Ignoring policy type");
                None
            }
        })
        .collect::<DirectionSet>();

    let ingress = spec
        .ingress
        .into_iter()
        .flatten()
        .map(|rule| Rule {
            peers: rule.from.into_iter().flatten().filter_map(mk_peer).collect(),
            ports: mk_ports(rule.ports),
        })
        .collect();

    let egress = spec
        .egress
        .into_iter()
        .flatten()
        .map(|rule| Rule {
            peers: rule.to.into_iter().flatten().filter_map(mk_peer).collect(),
            ports: mk_ports(rule.ports),
        })
        .collect();

    NetworkPolicy {
        name,
        namespace,
        labels,
        pod_selector: mk_selector(spec.pod_selector),
        directions,
        ingress,
        egress,
    }
}

/// Converts a selector, failing closed: a selector that cannot be
/// interpreted matches nothing rather than aborting the run.
fn mk_selector(selector: k8s::LabelSelector) -> Selector {
    match Selector::try_from(selector) {
        Ok(selector) => selector,
        Err(error) => {
            warn!(%error, "Unreadable selector matches nothing");
            Selector::never()
        }
    }
}

/// Converts a peer, or drops it.
///
/// CIDR peers don't select pods; dropping them keeps a selector-less
/// `ipBlock` peer from degrading into a match-everything peer.
fn mk_peer(peer: k8s::NetworkPolicyPeer) -> Option<Peer> {
    if peer.ip_block.is_some() {
        debug!("Ignoring ipBlock peer");
        return None;
    }

    Some(Peer {
        pod_selector: peer.pod_selector.map(mk_selector),
        namespace_selector: peer.namespace_selector.map(mk_selector),
    })
}

/// Converts a rule's port list. `None` means the rule allows all ports.
///
/// Named ports cannot be resolved without pod specs and are skipped; a rule
/// left with an empty port list contributes nothing rather than everything.
/// A port entry with no number at all imposes no restriction, which makes
/// the whole rule unrestricted.
fn mk_ports(ports: Option<Vec<k8s::NetworkPolicyPort>>) -> Option<Vec<u16>> {
    let ports = match ports {
        Some(ports) if !ports.is_empty() => ports,
        _ => return None,
    };

    if ports.iter().any(|p| p.port.is_none()) {
        return None;
    }

    Some(
        ports
            .into_iter()
            .filter_map(|p| match p.port {
                Some(k8s::IntOrString::Int(port)) => match u16::try_from(port) {
                    Ok(port) => Some(port),
                    Err(_) => {
                        info!(port, "Ignoring out-of-range port");
                        None
                    }
                },
                Some(k8s::IntOrString::String(port)) => {
                    info!(%port, "Ignoring named port");
                    None
                }
                None => None,
            })
            .collect(),
    )
}
