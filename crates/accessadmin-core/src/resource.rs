//! The resource descriptor data model: the mapping from resource-element
//! name to either a concrete access-request value list or a policy-side
//! pattern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A policy-side pattern for one resource element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResource {
    /// The glob-style values this element's pattern matches (`*` = any run
    /// of characters, `?` = exactly one character).
    pub values: Vec<String>,
    /// When true, this element matches any value *not* covered by
    /// `values`, rather than values covered by it.
    #[serde(default)]
    pub is_excludes: bool,
    /// When true, this element also matches any descendant resource once
    /// the pattern is satisfied at this level (e.g. a `database` pattern
    /// with `is_recursive = true` also covers every table and column under
    /// matching databases).
    #[serde(default)]
    pub is_recursive: bool,
}

impl PolicyResource {
    /// A pattern that matches any single value at this element, without
    /// recursing to descendants.
    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            values: vec![accessadmin_spi::sentinel::WILDCARD.to_owned()],
            is_excludes: false,
            is_recursive: false,
        }
    }
}

/// One resource-element's value: either the concrete values an access
/// request supplies, or a policy pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
    /// Concrete values, as supplied by an access request.
    Request(Vec<String>),
    /// A policy pattern, as declared in `Policy::resources` /
    /// `Policy::additional_resources`.
    Policy(PolicyResource),
}

impl ResourceValue {
    /// The element's values, regardless of variant.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            ResourceValue::Request(values) => values,
            ResourceValue::Policy(pattern) => &pattern.values,
        }
    }

    /// Whether this element excludes its values (always `false` for a
    /// plain request value list).
    #[must_use]
    pub fn is_excludes(&self) -> bool {
        matches!(self, ResourceValue::Policy(p) if p.is_excludes)
    }

    /// Whether this element recurses to descendants (always `false` for a
    /// plain request value list).
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        matches!(self, ResourceValue::Policy(p) if p.is_recursive)
    }
}

impl From<Vec<String>> for ResourceValue {
    fn from(values: Vec<String>) -> Self {
        ResourceValue::Request(values)
    }
}

impl From<PolicyResource> for ResourceValue {
    fn from(pattern: PolicyResource) -> Self {
        ResourceValue::Policy(pattern)
    }
}

/// A resource descriptor: resource-element name to its value.
///
/// Hierarchical order among elements is *not* carried here — it is
/// declared once by the service definition (see
/// [`crate::service_def::ServiceDef::resource_hierarchy`]) and applied by
/// the matcher and signature functions.
pub type ResourceMap = HashMap<String, ResourceValue>;

/// Build a [`ResourceMap`] of policy patterns from `(name, values)` pairs,
/// each defaulting to non-excludes, non-recursive.
#[must_use]
pub fn policy_resources<I, S>(pairs: I) -> ResourceMap
where
    I: IntoIterator<Item = (S, Vec<String>)>,
    S: Into<String>,
{
    pairs
        .into_iter()
        .map(|(name, values)| {
            (
                name.into(),
                ResourceValue::Policy(PolicyResource {
                    values,
                    is_excludes: false,
                    is_recursive: false,
                }),
            )
        })
        .collect()
}

/// Build a [`ResourceMap`] of concrete request values from `(name, values)`
/// pairs.
#[must_use]
pub fn request_resources<I, S>(pairs: I) -> ResourceMap
where
    I: IntoIterator<Item = (S, Vec<String>)>,
    S: Into<String>,
{
    pairs
        .into_iter()
        .map(|(name, values)| (name.into(), ResourceValue::Request(values)))
        .collect()
}

/// Compute the canonical resource signature of a policy's primary and
/// additional resource maps.
///
/// Two policies have equal signatures iff their resource patterns admit
/// exactly the same resource set: the same element names with the same
/// values, excludes flag, and recursive flag, ignoring declaration order
/// of elements and of additional-resource entries.
#[must_use]
pub fn resource_signature(primary: &ResourceMap, additional: &[ResourceMap]) -> String {
    let mut additional_parts: Vec<String> = additional.iter().map(canonical_map).collect();
    additional_parts.sort();

    let mut parts = vec![canonical_map(primary)];
    parts.extend(additional_parts);
    parts.join("|")
}

fn canonical_map(map: &ResourceMap) -> String {
    let mut entries: Vec<(&String, &ResourceValue)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    entries
        .iter()
        .map(|(name, value)| {
            let mut values = value.values().to_vec();
            values.sort();
            format!(
                "{name}:{}:{}:[{}]",
                u8::from(value.is_excludes()),
                u8::from(value.is_recursive()),
                values.join(",")
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}
