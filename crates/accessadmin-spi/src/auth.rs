//! The authentication context collaborator: resolves the effective role set
//! for a `(user, groups)` pair.

use std::collections::HashSet;

use crate::error::AuthContextError;

/// Resolves roles for a user/groups pair.
///
/// Implementations typically consult a roles table that maps a role name
/// to its member users and groups; this trait only exposes the resolved
/// result, keeping the membership representation out of the core crate.
#[async_trait::async_trait]
pub trait AuthContext: Send + Sync {
    /// Compute the effective set of role names held by `user` together
    /// with the groups in `user_groups`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthContextError`] if the backing role store could not be
    /// reached.
    async fn get_roles_for_user_and_groups(
        &self,
        user: &str,
        user_groups: &[String],
    ) -> Result<HashSet<String>, AuthContextError>;
}

/// A fixed role assignment, for tests and reference implementations.
///
/// Maps each `(user, group)` principal to the set of roles it is a member
/// of; `get_roles_for_user_and_groups` unions the roles reachable from the
/// user and every one of their groups.
#[derive(Debug, Default, Clone)]
pub struct StaticAuthContext {
    roles_by_user: std::collections::HashMap<String, HashSet<String>>,
    roles_by_group: std::collections::HashMap<String, HashSet<String>>,
}

impl StaticAuthContext {
    /// Create an empty role assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to `user`.
    #[must_use]
    pub fn with_user_role(mut self, user: impl Into<String>, role: impl Into<String>) -> Self {
        self.roles_by_user
            .entry(user.into())
            .or_default()
            .insert(role.into());
        self
    }

    /// Grant `role` to every member of `group`.
    #[must_use]
    pub fn with_group_role(mut self, group: impl Into<String>, role: impl Into<String>) -> Self {
        self.roles_by_group
            .entry(group.into())
            .or_default()
            .insert(role.into());
        self
    }
}

#[async_trait::async_trait]
impl AuthContext for StaticAuthContext {
    async fn get_roles_for_user_and_groups(
        &self,
        user: &str,
        user_groups: &[String],
    ) -> Result<HashSet<String>, AuthContextError> {
        let mut roles = HashSet::new();
        if let Some(r) = self.roles_by_user.get(user) {
            roles.extend(r.iter().cloned());
        }
        for group in user_groups {
            if let Some(r) = self.roles_by_group.get(group) {
                roles.extend(r.iter().cloned());
            }
        }
        Ok(roles)
    }
}
