//! Policy repository: the evaluators for one (service, zone) pair.

use crate::evaluator::PolicyEvaluator;
use crate::matcher::MatchScope;
use crate::policy::{Policy, PolicyType};
use crate::resource::ResourceMap;

/// Holds the evaluators for one zone (or the tag-policy set) and offers
/// likely-match pre-filtering and iteration over them.
#[derive(Debug, Clone, Default)]
pub struct PolicyRepository {
    zone_name: String,
    evaluators: Vec<PolicyEvaluator>,
}

impl PolicyRepository {
    /// Build a repository for `zone_name` from `policies`.
    #[must_use]
    pub fn new(zone_name: impl Into<String>, policies: Vec<Policy>) -> Self {
        Self {
            zone_name: zone_name.into(),
            evaluators: policies.into_iter().map(PolicyEvaluator::new).collect(),
        }
    }

    /// The zone this repository holds evaluators for. Empty denotes the
    /// default zone.
    #[must_use]
    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    /// All evaluators in declaration order.
    #[must_use]
    pub fn evaluators(&self) -> &[PolicyEvaluator] {
        &self.evaluators
    }

    /// Number of policies held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    /// Whether this repository holds no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Evaluators that may match `resource`, optionally restricted to
    /// `policy_type`.
    ///
    /// May return a superset of true matches but must never omit one — the
    /// caller is responsible for the precise access-type check. Matches
    /// under [`MatchScope::Any`] so callers probing with a partial resource
    /// (e.g. only a `database` element of a `database`/`table`/`column`
    /// hierarchy) still see every policy that could apply to a descendant.
    #[must_use]
    pub fn get_likely_match_policy_evaluators(
        &self,
        resource: &ResourceMap,
        hierarchy: &[String],
        policy_type: Option<PolicyType>,
    ) -> Vec<&PolicyEvaluator> {
        self.evaluators
            .iter()
            .filter(|e| policy_type.is_none_or(|t| e.policy().policy_type == t))
            .filter(|e| {
                crate::matcher::match_resource_scoped(&e.policy().resources, resource, hierarchy, MatchScope::Any)
                    .is_match()
            })
            .collect()
    }

    /// Policies whose resource pattern is an exact cover of `resource`
    /// (neither a strict superset nor subset).
    #[must_use]
    pub fn get_exact_match_policies(&self, resource: &ResourceMap, hierarchy: &[String]) -> Vec<&Policy> {
        self.evaluators
            .iter()
            .filter(|e| e.is_complete_match(resource, hierarchy))
            .map(PolicyEvaluator::policy)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{policy_resources, request_resources};

    fn hierarchy() -> Vec<String> {
        vec!["database".to_owned(), "table".to_owned()]
    }

    fn policy(id: i64, db: &str) -> Policy {
        Policy {
            id,
            resources: policy_resources([("database", vec![db.to_owned()])]),
            ..Default::default()
        }
    }

    #[test]
    fn likely_match_never_misses_a_true_match() {
        let repo = PolicyRepository::new("", vec![policy(1, "sales"), policy(2, "marketing")]);
        let resource = request_resources([("database", vec!["sales".to_owned()])]);
        let matches = repo.get_likely_match_policy_evaluators(&resource, &hierarchy(), None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].policy().id, 1);
    }

    #[test]
    fn exact_match_excludes_recursive_supersets() {
        let mut recursive = policy(3, "sales");
        if let Some(crate::resource::ResourceValue::Policy(p)) = recursive.resources.get_mut("database") {
            p.is_recursive = true;
        }
        let repo = PolicyRepository::new("", vec![policy(1, "sales"), recursive]);
        let resource = request_resources([("database", vec!["sales".to_owned()])]);
        let exact = repo.get_exact_match_policies(&resource, &hierarchy());
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, 1);
    }

    #[test]
    fn round_trip_includes_the_policy_itself() {
        let p = policy(7, "sales");
        let repo = PolicyRepository::new("", vec![p.clone()]);
        let exact = repo.get_exact_match_policies(&p.resources, &hierarchy());
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, 7);
    }
}
