use crate::{LabelSelector, LabelSelectorRequirement};
use anyhow::{bail, Result};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

#[derive(Clone, Debug, Eq, Default)]
pub struct Labels(Arc<Map>);

pub type Map = BTreeMap<String, String>;

pub type Expressions = Vec<Expression>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// Selects a set of pods or namespaces by their labels.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct Selector {
    match_labels: Option<Map>,
    match_expressions: Option<Expressions>,
}

// === Selector ===

impl Selector {
    pub fn from_expressions(exprs: Expressions) -> Self {
        Self {
            match_labels: None,
            match_expressions: Some(exprs),
        }
    }

    pub fn from_map(map: Map) -> Self {
        Self {
            match_labels: Some(map),
            match_expressions: None,
        }
    }

    /// A selector that matches no label set.
    ///
    /// Used to fail closed when a selector cannot be interpreted: an `In`
    /// expression with an empty value set is never satisfied.
    pub fn never() -> Self {
        Self::from_expressions(vec![Expression {
            key: String::new(),
            operator: Operator::In,
            values: BTreeSet::new(),
        }])
    }

    /// Whether `labels` satisfies every term of this selector.
    ///
    /// The empty selector matches everything.
    pub fn matches(&self, labels: &Labels) -> bool {
        for expr in self.match_expressions.iter().flatten() {
            if !expr.matches(labels.as_ref()) {
                return false;
            }
        }

        if let Some(match_labels) = self.match_labels.as_ref() {
            for (k, v) in match_labels.iter() {
                if labels.0.get(k) != Some(v) {
                    return false;
                }
            }
        }

        true
    }
}

impl std::convert::TryFrom<LabelSelector> for Selector {
    type Error = anyhow::Error;

    fn try_from(selector: LabelSelector) -> Result<Self> {
        let match_expressions = selector
            .match_expressions
            .map(|exprs| {
                exprs
                    .into_iter()
                    .map(Expression::try_from)
                    .collect::<Result<Expressions>>()
            })
            .transpose()?;

        Ok(Self {
            match_labels: selector.match_labels,
            match_expressions,
        })
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl std::iter::FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self::from_expressions(iter.into_iter().collect())
    }
}

// === Labels ===

impl From<Map> for Labels {
    #[inline]
    fn from(labels: Map) -> Self {
        Self(Arc::new(labels))
    }
}

impl From<Option<Map>> for Labels {
    #[inline]
    fn from(labels: Option<Map>) -> Self {
        Self(Arc::new(labels.unwrap_or_default()))
    }
}

impl AsRef<Map> for Labels {
    #[inline]
    fn as_ref(&self) -> &Map {
        self.0.as_ref()
    }
}

impl<T: AsRef<Map>> std::cmp::PartialEq<T> for Labels {
    #[inline]
    fn eq(&self, t: &T) -> bool {
        self.0.as_ref().eq(t.as_ref())
    }
}

impl serde::Serialize for Labels {
    #[inline]
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl std::iter::FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Labels {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// === Expression ===

impl Expression {
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            values: values.into_iter().collect(),
        }
    }

    fn matches(&self, labels: &Map) -> bool {
        match self.operator {
            Operator::In => match labels.get(&self.key) {
                Some(v) => self.values.contains(v),
                None => false,
            },
            Operator::NotIn => match labels.get(&self.key) {
                Some(v) => !self.values.contains(v),
                None => true,
            },
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}

impl std::convert::TryFrom<LabelSelectorRequirement> for Expression {
    type Error = anyhow::Error;

    fn try_from(req: LabelSelectorRequirement) -> Result<Self> {
        let operator = match req.operator.as_str() {
            "In" => Operator::In,
            "NotIn" => Operator::NotIn,
            "Exists" => Operator::Exists,
            "DoesNotExist" => Operator::DoesNotExist,
            op => bail!("unsupported selector operator: {}", op),
        };

        Ok(Self {
            key: req.key,
            operator,
            values: req.values.into_iter().flatten().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::FromIterator;

    #[test]
    fn test_matches() {
        for (selector, labels, matches, msg) in &[
            (Selector::default(), Labels::default(), true, "empty match"),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(Some(("foo", "bar"))),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                true,
                "sufficient label match",
            ),
            (
                Selector::from_iter(Some(("foo", "bar"))),
                Labels::from_iter(Some(("foo", "baz"))),
                false,
                "value mismatch",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "foo",
                    Operator::In,
                    Some("bar".to_string()),
                ))),
                Labels::from_iter(vec![("foo", "bar"), ("bah", "baz")]),
                true,
                "in match",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "foo",
                    Operator::In,
                    Some("bar".to_string()),
                ))),
                Labels::default(),
                false,
                "in without label",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "foo",
                    Operator::NotIn,
                    Some("bar".to_string()),
                ))),
                Labels::from_iter(Some(("foo", "bar"))),
                false,
                "not-in mismatch",
            ),
            (
                Selector::from_iter(Some(Expression::new(
                    "foo",
                    Operator::NotIn,
                    Some("bar".to_string()),
                ))),
                Labels::default(),
                true,
                "not-in without label",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::Exists, None))),
                Labels::from_iter(Some(("foo", "bar"))),
                true,
                "exists",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::Exists, None))),
                Labels::default(),
                false,
                "exists without label",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::DoesNotExist, None))),
                Labels::from_iter(Some(("foo", "bar"))),
                false,
                "does-not-exist with label",
            ),
            (
                Selector::from_iter(Some(Expression::new("foo", Operator::DoesNotExist, None))),
                Labels::default(),
                true,
                "does-not-exist without label",
            ),
            (
                Selector::never(),
                Labels::default(),
                false,
                "never matches empty",
            ),
            (
                Selector::never(),
                Labels::from_iter(Some(("foo", "bar"))),
                false,
                "never matches labeled",
            ),
        ] {
            assert_eq!(selector.matches(labels), *matches, "{}", msg);
        }
    }

    #[test]
    fn from_label_selector() {
        let selector = Selector::try_from(LabelSelector {
            match_labels: Some(
                Some(("app".to_string(), "web".to_string()))
                    .into_iter()
                    .collect(),
            ),
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "tier".to_string(),
                operator: "In".to_string(),
                values: Some(vec!["frontend".to_string()]),
            }]),
        })
        .expect("selector must convert");

        assert!(selector.matches(&Labels::from_iter(vec![("app", "web"), ("tier", "frontend")])));
        assert!(!selector.matches(&Labels::from_iter(vec![("app", "web"), ("tier", "backend")])));
    }

    #[test]
    fn unsupported_operator_is_an_error() {
        let res = Selector::try_from(LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "tier".to_string(),
                operator: "Near".to_string(),
                values: None,
            }]),
        });
        assert!(res.is_err());
    }
}
