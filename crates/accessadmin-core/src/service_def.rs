//! Service-definition helper: implied-grant expansion and enumeration of
//! access types by policy subtype.

use std::collections::{HashMap, HashSet};

use accessadmin_spi::sentinel::ADMIN_ACCESS;

use crate::policy::{Policy, PolicyItem, PolicyType};

/// A service definition: the resource hierarchy, the valid access types,
/// and their implied-grant closure.
///
/// The implied-grant closure is computed once at construction — the
/// source Ranger engine's `RangerServiceDefHelper` does the same, since
/// the implication table is fixed for the lifetime of a service
/// definition snapshot.
#[derive(Debug, Clone)]
pub struct ServiceDef {
    name: String,
    resource_hierarchy: Vec<String>,
    access_types: Vec<String>,
    implied_closure: HashMap<String, HashSet<String>>,
    tokenized_elements: HashSet<String>,
}

impl ServiceDef {
    /// Build a service definition.
    ///
    /// `implies` maps an access type to the access types it *directly*
    /// implies (not counting itself); the transitive closure (including
    /// the access type itself) is computed here.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        resource_hierarchy: Vec<String>,
        access_types: Vec<String>,
        implies: &HashMap<String, Vec<String>>,
        tokenized_elements: HashSet<String>,
    ) -> Self {
        let mut implied_closure = HashMap::new();
        for access_type in &access_types {
            implied_closure.insert(access_type.clone(), close_implications(access_type, implies));
        }
        Self {
            name: name.into(),
            resource_hierarchy,
            access_types,
            implied_closure,
            tokenized_elements,
        }
    }

    /// The service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The hierarchical order of resource elements, root to leaf.
    #[must_use]
    pub fn resource_hierarchy(&self) -> &[String] {
        &self.resource_hierarchy
    }

    /// All valid access type names for this service.
    #[must_use]
    pub fn access_types(&self) -> &[String] {
        &self.access_types
    }

    /// Whether `element` has a token replacer registered (i.e. its values
    /// may contain macro parameters that get expanded during evaluation).
    #[must_use]
    pub fn is_tokenized(&self, element: &str) -> bool {
        self.tokenized_elements.contains(element)
    }

    /// The transitive closure of access types implied by `access_type`,
    /// including `access_type` itself. Empty if `access_type` is not a
    /// valid access type for this service.
    #[must_use]
    pub fn expand_implied(&self, access_type: &str) -> HashSet<String> {
        self.implied_closure
            .get(access_type)
            .cloned()
            .unwrap_or_default()
    }
}

fn close_implications(start: &str, implies: &HashMap<String, Vec<String>>) -> HashSet<String> {
    let mut closure = HashSet::new();
    let mut stack = vec![start.to_owned()];
    closure.insert(start.to_owned());
    while let Some(current) = stack.pop() {
        if let Some(next) = implies.get(&current) {
            for implied in next {
                if closure.insert(implied.clone()) {
                    stack.push(implied.clone());
                }
            }
        }
    }
    closure
}

/// All access types (after implied-grant expansion) carried by `policy`'s
/// relevant item collections.
///
/// Returns the empty set for a policy of unknown type (logged). Returns
/// `{ADMIN_ACCESS}` instead of the empty set when the policy's type is
/// known but its item collections declare no access types at all.
#[must_use]
pub fn get_all_access_types(policy: &Policy, service_def: &ServiceDef) -> HashSet<String> {
    if matches!(policy.policy_type, PolicyType::Unknown) {
        tracing::error!(policy_id = policy.id, "unknown policy type; no access types computed");
        return HashSet::new();
    }

    let mut result = HashSet::new();
    for items in policy.item_collections() {
        for item in items {
            for access in &item.accesses {
                result.extend(service_def.expand_implied(&access.access_type));
            }
        }
    }

    if result.is_empty() {
        result.insert(ADMIN_ACCESS.to_owned());
    }
    result
}

/// The access types a caller must be authorized for to realize the
/// transition from `old` to `new`, when their resource signatures are
/// equal: the union, across users/groups/roles, of the symmetric
/// difference between each principal's expanded access-type set in `old`
/// and in `new`.
///
/// Returns `{ADMIN_ACCESS}` instead of the empty set when the delta is
/// empty (no principal's expanded accesses actually changed).
#[must_use]
pub fn get_all_modified_access_types(
    old: &Policy,
    new: &Policy,
    service_def: &ServiceDef,
) -> HashSet<String> {
    let old_maps = PrincipalAccessMaps::build(old, service_def);
    let new_maps = PrincipalAccessMaps::build(new, service_def);

    let mut delta = HashSet::new();
    delta.extend(symmetric_diff(&old_maps.users, &new_maps.users));
    delta.extend(symmetric_diff(&old_maps.groups, &new_maps.groups));
    delta.extend(symmetric_diff(&old_maps.roles, &new_maps.roles));

    if delta.is_empty() {
        delta.insert(ADMIN_ACCESS.to_owned());
    }
    delta
}

struct PrincipalAccessMaps {
    users: HashMap<String, HashSet<String>>,
    groups: HashMap<String, HashSet<String>>,
    roles: HashMap<String, HashSet<String>>,
}

impl PrincipalAccessMaps {
    fn build(policy: &Policy, service_def: &ServiceDef) -> Self {
        let mut users = HashMap::new();
        let mut groups = HashMap::new();
        let mut roles = HashMap::new();

        for items in policy.item_collections() {
            for item in items {
                accumulate(item, service_def, &mut users, &mut groups, &mut roles);
            }
        }

        Self { users, groups, roles }
    }
}

fn accumulate(
    item: &PolicyItem,
    service_def: &ServiceDef,
    users: &mut HashMap<String, HashSet<String>>,
    groups: &mut HashMap<String, HashSet<String>>,
    roles: &mut HashMap<String, HashSet<String>>,
) {
    let expanded: HashSet<String> = item
        .accesses
        .iter()
        .flat_map(|a| service_def.expand_implied(&a.access_type))
        .collect();

    for user in &item.users {
        users.entry(user.clone()).or_default().extend(expanded.iter().cloned());
    }
    for group in &item.groups {
        groups.entry(group.clone()).or_default().extend(expanded.iter().cloned());
    }
    for role in &item.roles {
        roles.entry(role.clone()).or_default().extend(expanded.iter().cloned());
    }
}

fn symmetric_diff(
    old: &HashMap<String, HashSet<String>>,
    new: &HashMap<String, HashSet<String>>,
) -> HashSet<String> {
    let mut diff = HashSet::new();
    let empty = HashSet::new();

    for principal in old.keys().chain(new.keys()).collect::<HashSet<_>>() {
        let old_set = old.get(principal).unwrap_or(&empty);
        let new_set = new.get(principal).unwrap_or(&empty);
        diff.extend(new_set.difference(old_set).cloned());
        diff.extend(old_set.difference(new_set).cloned());
    }
    diff
}
