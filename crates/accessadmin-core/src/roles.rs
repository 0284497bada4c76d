//! Roles table: role name to member users/groups, and effective-role
//! computation for a (user, groups) pair.

use std::collections::{HashMap, HashSet};

/// One role's membership.
#[derive(Debug, Clone, Default)]
pub struct RoleMembers {
    /// User names granted this role directly.
    pub users: HashSet<String>,
    /// Group names granted this role; any user in one of these groups
    /// holds the role.
    pub groups: HashSet<String>,
}

/// Maps role name to its membership. Replaced wholesale under the engine's
/// write lock on a role update; never mutated in place by a reader.
#[derive(Debug, Clone, Default)]
pub struct RolesTable {
    roles: HashMap<String, RoleMembers>,
    version: i64,
}

impl RolesTable {
    /// Build a table from `(role_name, members)` pairs at `version`.
    #[must_use]
    pub fn new(roles: HashMap<String, RoleMembers>, version: i64) -> Self {
        Self { roles, version }
    }

    /// The role version this table was built at.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// The role names `user` (directly, or via any of `groups`) belongs
    /// to.
    #[must_use]
    pub fn effective_roles(&self, user: &str, groups: &[String]) -> HashSet<String> {
        self.roles
            .iter()
            .filter(|(_, members)| {
                members.users.contains(user) || groups.iter().any(|g| members.groups.contains(g))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The members of `role`, if it exists.
    #[must_use]
    pub fn role(&self, role: &str) -> Option<&RoleMembers> {
        self.roles.get(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RolesTable {
        let mut roles = HashMap::new();
        roles.insert(
            "data_admin".to_owned(),
            RoleMembers {
                users: HashSet::from(["alice".to_owned()]),
                groups: HashSet::from(["dba".to_owned()]),
            },
        );
        roles.insert(
            "auditor".to_owned(),
            RoleMembers {
                users: HashSet::new(),
                groups: HashSet::from(["compliance".to_owned()]),
            },
        );
        RolesTable::new(roles, 1)
    }

    #[test]
    fn direct_user_membership_is_effective() {
        let roles = table().effective_roles("alice", &[]);
        assert_eq!(roles, HashSet::from(["data_admin".to_owned()]));
    }

    #[test]
    fn group_membership_is_effective() {
        let roles = table().effective_roles("bob", &["dba".to_owned()]);
        assert_eq!(roles, HashSet::from(["data_admin".to_owned()]));
    }

    #[test]
    fn unrelated_user_has_no_roles() {
        let roles = table().effective_roles("carol", &["marketing".to_owned()]);
        assert!(roles.is_empty());
    }

    #[test]
    fn multiple_roles_accumulate() {
        let roles = table().effective_roles("alice", &["compliance".to_owned()]);
        assert_eq!(roles, HashSet::from(["data_admin".to_owned(), "auditor".to_owned()]));
    }
}
