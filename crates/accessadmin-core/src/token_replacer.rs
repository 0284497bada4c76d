//! Macro token expansion for policy resource values (`${USER}`,
//! `${USER_GROUPS}`, ...) and the wildcard evaluation context used to force
//! every token to expand to `*` for delegated-admin checks.

use accessadmin_spi::sentinel::WILDCARD;

use crate::resource::{PolicyResource, ResourceMap, ResourceValue};
use crate::service_def::ServiceDef;

/// A context evaluators consult to resolve context-dependent values (the
/// requesting user, their groups, session attributes, ...).
///
/// Modeled as a single `lookup` method rather than an overridable map, so
/// a "return the wildcard for everything" context is a one-line
/// implementation rather than a map subclass.
pub trait EvalContext: Send + Sync {
    /// Resolve `key`, or `None` if this context has no value for it.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// An [`EvalContext`] that resolves every key to the wildcard.
///
/// Used by delegated-admin checks: the question being asked is "does the
/// admin have the right over the entire shape of what this policy could
/// match", so every macro token is forced to its most permissive possible
/// expansion.
#[derive(Debug, Default, Clone, Copy)]
pub struct WildcardEvalContext;

impl EvalContext for WildcardEvalContext {
    fn lookup(&self, _key: &str) -> Option<String> {
        Some(WILDCARD.to_owned())
    }
}

/// Expands `${TOKEN}`-style macro parameters within a resource value,
/// resolving each token through an [`EvalContext`].
pub trait StringTokenReplacer: Send + Sync {
    /// Replace every `${TOKEN}` occurrence in `value` with the context's
    /// resolution for `TOKEN`. Tokens the context cannot resolve are left
    /// untouched.
    fn replace_tokens(&self, value: &str, ctx: &dyn EvalContext) -> String;
}

/// The standard `${TOKEN}` macro replacer.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacroTokenReplacer;

impl StringTokenReplacer for MacroTokenReplacer {
    fn replace_tokens(&self, value: &str, ctx: &dyn EvalContext) -> String {
        let mut result = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find('}') else {
                result.push_str("${");
                rest = after_open;
                break;
            };
            let token = &after_open[..end];
            match ctx.lookup(token) {
                Some(replacement) => result.push_str(&replacement),
                None => {
                    result.push_str("${");
                    result.push_str(token);
                    result.push('}');
                }
            }
            rest = &after_open[end + 1..];
        }
        result.push_str(rest);
        result
    }
}

/// Expand every tokenized resource element of `resources` to its
/// wildcard-macro form, leaving non-tokenized elements unchanged.
///
/// This is the macro-expansion step delegated-admin checks run before
/// handing a policy's resources to the matcher (spec §4.1).
#[must_use]
pub fn expand_for_admin(
    resources: &ResourceMap,
    service_def: &ServiceDef,
    replacer: &dyn StringTokenReplacer,
) -> ResourceMap {
    let ctx = WildcardEvalContext;
    resources
        .iter()
        .map(|(name, value)| {
            if !service_def.is_tokenized(name) {
                return (name.clone(), value.clone());
            }
            let expanded_values: Vec<String> = value
                .values()
                .iter()
                .map(|v| replacer.replace_tokens(v, &ctx))
                .collect();
            let expanded = match value {
                ResourceValue::Request(_) => ResourceValue::Request(expanded_values),
                ResourceValue::Policy(pattern) => ResourceValue::Policy(PolicyResource {
                    values: expanded_values,
                    is_excludes: pattern.is_excludes,
                    is_recursive: pattern.is_recursive,
                }),
            };
            (name.clone(), expanded)
        })
        .collect()
}
