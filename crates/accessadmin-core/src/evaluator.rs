//! The policy evaluator: answers "which of these access types does this
//! policy allow for this (user, groups, roles) on this resource?" for a
//! single policy, and exposes the raw policy.

use std::collections::HashSet;

use crate::matcher::{is_complete_match, match_resource};
use crate::policy::{Policy, PolicyItem};
use crate::resource::ResourceMap;
use crate::service_def::ServiceDef;

/// A per-policy evaluator.
///
/// Wraps one [`Policy`] and answers resource-match and allowed-access
/// questions against it. Stateless beyond the policy itself — cheap to
/// construct, safe to share behind an `Arc` across readers.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    policy: Policy,
}

impl PolicyEvaluator {
    /// Wrap `policy` for evaluation.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// The wrapped policy.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The access types this policy allows `(user, groups, roles)` on
    /// `resource`, restricted to `requested` when non-empty.
    ///
    /// Combines `allow` and `deny` (and their exceptions) the standard
    /// way: an `allowExceptions` item excuses matching principals from an
    /// otherwise-applicable `deny`; a `denyExceptions` item withdraws an
    /// otherwise-applicable `allow` from matching principals. Returns the
    /// empty set immediately if `resource` does not match this policy's
    /// pattern at all.
    #[must_use]
    pub fn get_allowed_accesses(
        &self,
        resource: &ResourceMap,
        user: &str,
        groups: &[String],
        roles: &HashSet<String>,
        requested: &HashSet<String>,
        hierarchy: &[String],
        service_def: &ServiceDef,
    ) -> HashSet<String> {
        if !match_resource(&self.policy.resources, resource, hierarchy).is_match() {
            return HashSet::new();
        }

        let allow = item_access_set(&self.policy.allow, user, groups, roles, service_def);
        let deny = item_access_set(&self.policy.deny, user, groups, roles, service_def);
        let allow_exceptions =
            item_access_set(&self.policy.allow_exceptions, user, groups, roles, service_def);
        let deny_exceptions =
            item_access_set(&self.policy.deny_exceptions, user, groups, roles, service_def);

        let effective_deny: HashSet<String> = deny.difference(&allow_exceptions).cloned().collect();
        let effective_allow: HashSet<String> =
            allow.difference(&deny_exceptions).cloned().collect();

        let mut allowed: HashSet<String> =
            effective_allow.difference(&effective_deny).cloned().collect();

        if !requested.is_empty() {
            allowed.retain(|a| requested.contains(a));
        }
        allowed
    }

    /// Whether `access_type` is allowed for `(user, groups)` on
    /// `resources`, restricted to the intersection with every resource in
    /// `additional_resources`.
    #[must_use]
    pub fn is_access_allowed(
        &self,
        resources: &ResourceMap,
        additional_resources: &[ResourceMap],
        user: &str,
        groups: &[String],
        access_type: &str,
        hierarchy: &[String],
        service_def: &ServiceDef,
    ) -> bool {
        let roles = HashSet::new();
        let requested = HashSet::from([access_type.to_owned()]);

        let mut allowed =
            self.get_allowed_accesses(resources, user, groups, &roles, &requested, hierarchy, service_def);
        if allowed.is_empty() {
            return false;
        }
        for extra in additional_resources {
            let extra_allowed =
                self.get_allowed_accesses(extra, user, groups, &roles, &requested, hierarchy, service_def);
            allowed = allowed.intersection(&extra_allowed).cloned().collect();
            if allowed.is_empty() {
                return false;
            }
        }
        allowed.contains(access_type)
    }

    /// Whether this policy's resource pattern is an exact cover of
    /// `resource`.
    #[must_use]
    pub fn is_complete_match(&self, resource: &ResourceMap, hierarchy: &[String]) -> bool {
        is_complete_match(&self.policy.resources, resource, hierarchy)
    }
}

fn item_access_set(
    items: &[PolicyItem],
    user: &str,
    groups: &[String],
    roles: &HashSet<String>,
    service_def: &ServiceDef,
) -> HashSet<String> {
    let mut result = HashSet::new();
    for item in items {
        if !principal_matches(item, user, groups, roles) {
            continue;
        }
        for access in &item.accesses {
            if access.is_allowed {
                result.extend(service_def.expand_implied(&access.access_type));
            }
        }
    }
    result
}

fn principal_matches(item: &PolicyItem, user: &str, groups: &[String], roles: &HashSet<String>) -> bool {
    item.users.iter().any(|u| u == user)
        || item.groups.iter().any(|g| groups.contains(g))
        || item.roles.iter().any(|r| roles.contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{policy_resources, request_resources};
    use std::collections::HashMap;

    fn service_def() -> ServiceDef {
        let mut implies = HashMap::new();
        implies.insert("update".to_owned(), vec!["select".to_owned()]);
        ServiceDef::new(
            "hive",
            vec!["database".to_owned(), "table".to_owned()],
            vec!["select".to_owned(), "update".to_owned()],
            &implies,
            HashSet::new(),
        )
    }

    fn hierarchy() -> Vec<String> {
        vec!["database".to_owned(), "table".to_owned()]
    }

    fn item(principal: &str, access_types: &[&str]) -> PolicyItem {
        PolicyItem {
            users: vec![principal.to_owned()],
            accesses: access_types
                .iter()
                .map(|a| crate::policy::PolicyItemAccess {
                    access_type: (*a).to_owned(),
                    is_allowed: true,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn allow_grants_implied_accesses() {
        let policy = Policy {
            resources: policy_resources([("database", vec!["sales".to_owned()])]),
            allow: vec![item("alice", &["update"])],
            ..Default::default()
        };
        let evaluator = PolicyEvaluator::new(policy);
        let resource = request_resources([("database", vec!["sales".to_owned()])]);
        let allowed = evaluator.get_allowed_accesses(
            &resource,
            "alice",
            &[],
            &HashSet::new(),
            &HashSet::new(),
            &hierarchy(),
            &service_def(),
        );
        assert_eq!(allowed, HashSet::from(["update".to_owned(), "select".to_owned()]));
    }

    #[test]
    fn deny_removes_allow() {
        let policy = Policy {
            resources: policy_resources([("database", vec!["sales".to_owned()])]),
            allow: vec![item("alice", &["select"])],
            deny: vec![item("alice", &["select"])],
            ..Default::default()
        };
        let evaluator = PolicyEvaluator::new(policy);
        let resource = request_resources([("database", vec!["sales".to_owned()])]);
        let allowed = evaluator.get_allowed_accesses(
            &resource,
            "alice",
            &[],
            &HashSet::new(),
            &HashSet::new(),
            &hierarchy(),
            &service_def(),
        );
        assert!(allowed.is_empty());
    }

    #[test]
    fn allow_exception_excuses_matching_principal_from_deny() {
        let policy = Policy {
            resources: policy_resources([("database", vec!["sales".to_owned()])]),
            allow: vec![item("alice", &["select"])],
            deny: vec![item("alice", &["select"])],
            allow_exceptions: vec![item("alice", &["select"])],
            ..Default::default()
        };
        let evaluator = PolicyEvaluator::new(policy);
        let resource = request_resources([("database", vec!["sales".to_owned()])]);
        let allowed = evaluator.get_allowed_accesses(
            &resource,
            "alice",
            &[],
            &HashSet::new(),
            &HashSet::new(),
            &hierarchy(),
            &service_def(),
        );
        assert!(allowed.contains("select"));
    }

    #[test]
    fn non_matching_resource_yields_empty_set() {
        let policy = Policy {
            resources: policy_resources([("database", vec!["sales".to_owned()])]),
            allow: vec![item("alice", &["select"])],
            ..Default::default()
        };
        let evaluator = PolicyEvaluator::new(policy);
        let resource = request_resources([("database", vec!["marketing".to_owned()])]);
        let allowed = evaluator.get_allowed_accesses(
            &resource,
            "alice",
            &[],
            &HashSet::new(),
            &HashSet::new(),
            &hierarchy(),
            &service_def(),
        );
        assert!(allowed.is_empty());
    }

    #[test]
    fn additional_resources_intersect_allowed_accesses() {
        let policy = Policy {
            resources: policy_resources([("database", vec!["sales".to_owned()])]),
            additional_resources: vec![policy_resources([("database", vec!["marketing".to_owned()])])],
            allow: vec![item("alice", &["select"])],
            ..Default::default()
        };
        let evaluator = PolicyEvaluator::new(policy);
        assert!(!evaluator.is_access_allowed(
            &policy_resources([("database", vec!["sales".to_owned()])]),
            &[policy_resources([("database", vec!["other".to_owned()])])],
            "alice",
            &[],
            "select",
            &hierarchy(),
            &service_def(),
        ));
    }
}
