use serde::Serialize;
use traffic_analyzer_k8s_api::{labels::Selector, Labels};

/// One immutable view of the cluster resources an analysis run consumes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub namespaces: Vec<Namespace>,
    pub pods: Vec<Pod>,
    pub policies: Vec<NetworkPolicy>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub labels: Labels,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pod {
    pub name: String,
    pub namespace: String,
    pub labels: Labels,
}

/// A network policy reduced to what route evaluation needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkPolicy {
    pub name: String,
    pub namespace: String,

    /// The policy object's own labels, carried for reporting only.
    pub labels: Labels,

    /// Scopes which pods in `namespace` this policy governs.
    pub pod_selector: Selector,

    /// The directions the policy declares. A policy declaring neither
    /// direction governs no traffic, even when its pod selector matches.
    pub directions: DirectionSet,

    pub ingress: Vec<Rule>,
    pub egress: Vec<Rule>,
}

/// A single ingress or egress rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rule {
    /// Peers are OR-combined: the rule applies if any peer matches.
    pub peers: Vec<Peer>,

    /// `None` means the rule imposes no port restriction. `Some` holds the
    /// OR-combined concrete ports; an empty list (every declared port was
    /// unusable) lets the rule contribute nothing.
    pub ports: Option<Vec<u16>>,
}

/// The "other side" of a rule: a pod selector and/or namespace selector.
///
/// Both present means AND. Both absent means the peer matches every pod.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Peer {
    pub pod_selector: Option<Selector>,
    pub namespace_selector: Option<Selector>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Ingress,
    Egress,
}

/// The closed set of directions a policy may declare.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectionSet {
    pub ingress: bool,
    pub egress: bool,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("unrecognized policy type: {0}")]
pub struct InvalidDirection(String);

/// Identifies a pod in analysis output.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRef {
    pub name: String,
    pub namespace: String,
}

/// Identifies a policy in analysis output, with its labels for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRef {
    pub name: String,
    pub namespace: String,
    pub labels: Labels,
}

/// Resolves a namespace's labels from the snapshot's namespace list.
///
/// An unknown namespace has no labels, which simply fails any namespace
/// selector evaluated against it.
pub fn namespace_labels(namespaces: &[Namespace], name: &str) -> Labels {
    namespaces
        .iter()
        .find(|ns| ns.name == name)
        .map(|ns| ns.labels.clone())
        .unwrap_or_default()
}

// === impl DirectionSet ===

impl DirectionSet {
    pub fn contains(&self, direction: Direction) -> bool {
        match direction {
            Direction::Ingress => self.ingress,
            Direction::Egress => self.egress,
        }
    }

    pub fn insert(&mut self, direction: Direction) {
        match direction {
            Direction::Ingress => self.ingress = true,
            Direction::Egress => self.egress = true,
        }
    }
}

impl std::iter::FromIterator<Direction> for DirectionSet {
    fn from_iter<T: IntoIterator<Item = Direction>>(iter: T) -> Self {
        let mut set = Self::default();
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

// === impl Direction ===

impl std::str::FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ingress" => Ok(Self::Ingress),
            "Egress" => Ok(Self::Egress),
            other => Err(InvalidDirection(other.to_string())),
        }
    }
}

// === refs ===

impl From<&Pod> for PodRef {
    fn from(pod: &Pod) -> Self {
        Self {
            name: pod.name.clone(),
            namespace: pod.namespace.clone(),
        }
    }
}

impl From<&NetworkPolicy> for PolicyRef {
    fn from(policy: &NetworkPolicy) -> Self {
        Self {
            name: policy.name.clone(),
            namespace: policy.namespace.clone(),
            labels: policy.labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_parse() {
        assert_eq!("Ingress".parse::<Direction>().unwrap(), Direction::Ingress);
        assert_eq!("Egress".parse::<Direction>().unwrap(), Direction::Egress);
        assert!("ingress".parse::<Direction>().is_err());
        assert!("Both".parse::<Direction>().is_err());
    }

    #[test]
    fn unknown_namespace_has_no_labels() {
        let namespaces = vec![Namespace {
            name: "ns-0".to_string(),
            labels: Some(("team", "a")).into_iter().collect(),
        }];
        assert_eq!(
            namespace_labels(&namespaces, "ns-0"),
            Some(("team", "a")).into_iter().collect::<Labels>()
        );
        assert_eq!(namespace_labels(&namespaces, "nope"), Labels::default());
    }
}
