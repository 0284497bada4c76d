//! The resource matcher: decides match / no-match / complete-match between
//! a policy's resource pattern and a supplied resource, honoring
//! recursion, excludes, and wildcards.

use crate::error::MatchError;
use crate::resource::ResourceMap;

/// How strictly [`is_match`] should require the request to declare every
/// element the policy declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// The request must supply a value for every element the policy
    /// declares (used for concrete access-request evaluation).
    SelfScope,
    /// An element the policy declares but the request omits is treated as
    /// unconstrained rather than a mismatch (used by discovery, which
    /// matches a resource or resource pattern against policies that may
    /// be declared over a different, overlapping set of elements).
    Any,
}

/// The outcome of matching a request against a policy pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// The pattern does not cover the request at all.
    None,
    /// The pattern covers the request, but is not an exact cover (e.g. it
    /// recurses past the request's declared depth, or the request omitted
    /// an element the policy constrains).
    Partial,
    /// The pattern covers exactly the values the request declares, at
    /// exactly the same declared depth, with matching excludes/recursive
    /// flags.
    Complete,
}

impl MatchType {
    /// Whether this outcome counts as a match at all (`Partial` or
    /// `Complete`).
    #[must_use]
    pub fn is_match(self) -> bool {
        !matches!(self, MatchType::None)
    }
}

/// Match `request` against `policy` under `scope`, honoring the
/// hierarchical element order declared by `hierarchy`.
///
/// `policy` elements not present in `hierarchy` are ignored — the service
/// definition is assumed to declare every element a policy can use.
#[must_use]
pub fn match_resource(policy: &ResourceMap, request: &ResourceMap, hierarchy: &[String]) -> MatchType {
    match_resource_scoped(policy, request, hierarchy, MatchScope::SelfScope)
}

/// [`match_resource`] with an explicit [`MatchScope`].
#[must_use]
pub fn match_resource_scoped(
    policy: &ResourceMap,
    request: &ResourceMap,
    hierarchy: &[String],
    scope: MatchScope,
) -> MatchType {
    let Some(last_idx) = last_declared_index(policy, hierarchy) else {
        return MatchType::None;
    };

    let mut complete = true;

    for name in hierarchy.iter().take(last_idx + 1) {
        let Some(pattern) = policy.get(name) else {
            // A gap in the policy's declared elements: unconstrained.
            continue;
        };

        match request.get(name) {
            None => match scope {
                MatchScope::Any => complete = false,
                MatchScope::SelfScope => return MatchType::None,
            },
            Some(value) => {
                if !element_matches(pattern.values(), pattern.is_excludes(), value.values()) {
                    return MatchType::None;
                }
                if pattern.is_excludes()
                    || pattern.is_recursive()
                    || value.is_excludes()
                    || value.is_recursive()
                    || !value_sets_equal(pattern.values(), value.values())
                {
                    complete = false;
                }
            }
        }
    }

    let last_is_recursive = policy
        .get(&hierarchy[last_idx])
        .is_some_and(|p| p.is_recursive());

    let deeper_requested = hierarchy[last_idx + 1..]
        .iter()
        .any(|name| request.contains_key(name));

    if deeper_requested {
        if !last_is_recursive {
            return MatchType::None;
        }
        complete = false;
    }

    if complete {
        MatchType::Complete
    } else {
        MatchType::Partial
    }
}

/// Whether `policy` is an exact cover of `target`: the same declared
/// elements, the same value sets, and matching excludes/recursive flags.
///
/// Used by policy-discovery's exact-match query, which may compare a
/// concrete resource (no excludes/recursive) or another policy's full
/// pattern (which can carry them) against a repository's evaluators.
#[must_use]
pub fn is_complete_match(policy: &ResourceMap, target: &ResourceMap, hierarchy: &[String]) -> bool {
    let policy_last = last_declared_index(policy, hierarchy);
    let target_last = last_declared_index(target, hierarchy);
    if policy_last != target_last {
        return false;
    }
    let Some(last_idx) = policy_last else {
        return false;
    };

    for name in hierarchy.iter().take(last_idx + 1) {
        let p = policy.get(name);
        let t = target.get(name);
        match (p, t) {
            (None, None) => continue,
            (Some(p), Some(t)) => {
                if !value_sets_equal(p.values(), t.values())
                    || p.is_excludes() != t.is_excludes()
                    || p.is_recursive() != t.is_recursive()
                {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// Validate that every element name declared by `resources` belongs to
/// `hierarchy` (spec §3: "each declared element name belongs to the
/// service-def's resource hierarchy").
///
/// # Errors
///
/// Returns [`MatchError::UnknownElement`] naming the first element found
/// that the hierarchy does not declare.
pub fn validate_hierarchy(resources: &ResourceMap, hierarchy: &[String]) -> Result<(), MatchError> {
    for name in resources.keys() {
        if !hierarchy.iter().any(|h| h == name) {
            return Err(MatchError::UnknownElement {
                element: name.clone(),
            });
        }
    }
    Ok(())
}

fn last_declared_index(resources: &ResourceMap, hierarchy: &[String]) -> Option<usize> {
    hierarchy
        .iter()
        .enumerate()
        .filter(|(_, name)| resources.contains_key(*name))
        .map(|(idx, _)| idx)
        .max()
}

fn value_sets_equal(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Whether `pattern_values` (interpreted as excluding when `is_excludes`)
/// covers every value in `request_values`. An empty `request_values` is
/// treated as unconstrained and always matches.
fn element_matches(pattern_values: &[String], is_excludes: bool, request_values: &[String]) -> bool {
    if request_values.is_empty() {
        return true;
    }
    let covered = |value: &str| pattern_values.iter().any(|pat| glob_match(pat, value));
    if is_excludes {
        request_values.iter().all(|v| !covered(v))
    } else {
        request_values.iter().all(|v| covered(v))
    }
}

/// A small glob matcher: `*` matches any run of characters (including
/// none), `?` matches exactly one character, everything else is literal.
#[must_use]
pub fn glob_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    glob_match_chars(&pattern, &value)
}

fn glob_match_chars(pattern: &[char], value: &[char]) -> bool {
    match pattern.first() {
        None => value.is_empty(),
        Some('*') => {
            glob_match_chars(&pattern[1..], value)
                || (!value.is_empty() && glob_match_chars(pattern, &value[1..]))
        }
        Some('?') => !value.is_empty() && glob_match_chars(&pattern[1..], &value[1..]),
        Some(c) => value.first() == Some(c) && glob_match_chars(&pattern[1..], &value[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{policy_resources, request_resources};

    fn hierarchy() -> Vec<String> {
        vec!["database".to_owned(), "table".to_owned(), "column".to_owned()]
    }

    #[test]
    fn glob_wildcard_matches_any_suffix() {
        assert!(glob_match("sales*", "sales_2024"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("sales*", "finance_2024"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "abbc"));
    }

    #[test]
    fn recursive_database_policy_covers_table_and_column() {
        let mut policy = policy_resources([("database", vec!["sales".to_owned()])]);
        if let Some(v) = policy.get_mut("database") {
            if let crate::resource::ResourceValue::Policy(p) = v {
                p.is_recursive = true;
            }
        }
        let request = request_resources([
            ("database", vec!["sales".to_owned()]),
            ("table", vec!["orders".to_owned()]),
            ("column", vec!["id".to_owned()]),
        ]);
        let result = match_resource(&policy, &request, &hierarchy());
        assert_eq!(result, MatchType::Partial);
    }

    #[test]
    fn non_recursive_database_policy_rejects_table_request() {
        let policy = policy_resources([("database", vec!["sales".to_owned()])]);
        let request = request_resources([
            ("database", vec!["sales".to_owned()]),
            ("table", vec!["orders".to_owned()]),
        ]);
        assert_eq!(match_resource(&policy, &request, &hierarchy()), MatchType::None);
    }

    #[test]
    fn database_only_request_against_database_only_policy_is_complete() {
        let policy = policy_resources([("database", vec!["sales".to_owned()])]);
        let request = request_resources([("database", vec!["sales".to_owned()])]);
        assert_eq!(
            match_resource(&policy, &request, &hierarchy()),
            MatchType::Complete
        );
    }

    #[test]
    fn excludes_flips_the_match() {
        let policy = policy_resources([("database", vec!["sales".to_owned()])]);
        let mut excluding = policy.clone();
        if let Some(crate::resource::ResourceValue::Policy(p)) = excluding.get_mut("database") {
            p.is_excludes = true;
        }
        let request = request_resources([("database", vec!["sales".to_owned()])]);
        assert_eq!(match_resource(&policy, &request, &hierarchy()), MatchType::Complete);
        assert_eq!(match_resource(&excluding, &request, &hierarchy()), MatchType::None);

        // The excludes pattern covers everything but "sales", a strict
        // superset of a request naming only "marketing" — a match, but not
        // a complete (exact) cover.
        let other_request = request_resources([("database", vec!["marketing".to_owned()])]);
        assert_eq!(
            match_resource(&excluding, &other_request, &hierarchy()),
            MatchType::Partial
        );
    }

    #[test]
    fn scope_any_tolerates_missing_request_elements() {
        let policy = policy_resources([
            ("database", vec!["sales".to_owned()]),
            ("table", vec!["orders".to_owned()]),
        ]);
        let request = request_resources([("database", vec!["sales".to_owned()])]);
        assert_eq!(
            match_resource_scoped(&policy, &request, &hierarchy(), MatchScope::SelfScope),
            MatchType::None
        );
        assert_eq!(
            match_resource_scoped(&policy, &request, &hierarchy(), MatchScope::Any),
            MatchType::Partial
        );
    }

    #[test]
    fn is_complete_match_requires_equal_depth_and_flags() {
        let a = policy_resources([("database", vec!["sales".to_owned()])]);
        let b = policy_resources([("database", vec!["sales".to_owned()])]);
        assert!(is_complete_match(&a, &b, &hierarchy()));

        let mut c = a.clone();
        if let Some(crate::resource::ResourceValue::Policy(p)) = c.get_mut("database") {
            p.is_recursive = true;
        }
        assert!(!is_complete_match(&a, &c, &hierarchy()));

        let d = policy_resources([
            ("database", vec!["sales".to_owned()]),
            ("table", vec!["orders".to_owned()]),
        ]);
        assert!(!is_complete_match(&a, &d, &hierarchy()));
    }

    #[test]
    fn validate_hierarchy_accepts_declared_elements() {
        let resources = policy_resources([
            ("database", vec!["sales".to_owned()]),
            ("table", vec!["orders".to_owned()]),
        ]);
        assert!(validate_hierarchy(&resources, &hierarchy()).is_ok());
    }

    #[test]
    fn validate_hierarchy_rejects_undeclared_element() {
        let resources = policy_resources([("warehouse", vec!["sales".to_owned()])]);
        let err = validate_hierarchy(&resources, &hierarchy()).unwrap_err();
        assert!(matches!(err, MatchError::UnknownElement { element } if element == "warehouse"));
    }
}
