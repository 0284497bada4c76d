//! The policy engine snapshot: an immutable, versioned bundle of
//! per-zone repositories, the tag-policy repository, the zone index, the
//! service definition, and the roles table.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::EngineError;
use crate::policy::Policy;
use crate::repository::PolicyRepository;
use crate::roles::RolesTable;
use crate::service_def::ServiceDef;
use crate::zone_index::ZoneIndex;

/// An immutable snapshot of policies, roles, and zone topology.
///
/// Cheap to share: every component is behind an `Arc`, so cloning a
/// `PolicyEngine` (or swapping it under a write guard) never deep-copies
/// untouched repositories.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    policy_version: i64,
    role_version: i64,
    repository_by_zone: HashMap<String, Arc<PolicyRepository>>,
    tag_policy_repository: Option<Arc<PolicyRepository>>,
    service_def: Arc<ServiceDef>,
    zone_index: Arc<ZoneIndex>,
    roles: Arc<RolesTable>,
}

/// An incremental change set applied to a [`PolicyEngine`] snapshot via
/// [`PolicyEngine::with_delta`].
///
/// Each touched zone carries its *complete* replacement policy list — the
/// engine does not merge individual policy edits into an existing
/// repository, it rebuilds the zone's repository wholesale, the same way
/// the teacher's `MountManager` replaces its whole table on persist rather
/// than patching individual entries.
#[derive(Debug, Clone, Default)]
pub struct PolicyDelta {
    /// The policy version this delta produces. Must be strictly greater
    /// than the snapshot's current version for a non-empty delta to be
    /// accepted.
    pub policy_version: i64,
    /// The new role version, if roles changed.
    pub role_version: Option<i64>,
    /// Zones whose repository should be rebuilt from this full policy
    /// list.
    pub zone_updates: HashMap<String, Vec<Policy>>,
    /// Zones to drop entirely.
    pub zone_removals: HashSet<String>,
    /// Replacement tag-policy list, if tag policies changed.
    pub tag_policies: Option<Vec<Policy>>,
    /// Replacement roles table, if roles changed.
    pub roles: Option<RolesTable>,
}

impl PolicyDelta {
    fn is_noop(&self) -> bool {
        self.zone_updates.is_empty()
            && self.zone_removals.is_empty()
            && self.tag_policies.is_none()
            && self.roles.is_none()
    }
}

impl PolicyEngine {
    /// Build a snapshot from a full policy bundle.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Match`] if any policy (in `repositories` or
    /// `tag_policy_repository`) declares a resource element `service_def`'s
    /// hierarchy does not recognize (spec §3's resource-hierarchy
    /// invariant).
    pub fn new(
        policy_version: i64,
        role_version: i64,
        repositories: HashMap<String, PolicyRepository>,
        tag_policy_repository: Option<PolicyRepository>,
        service_def: ServiceDef,
        zone_index: ZoneIndex,
        roles: RolesTable,
    ) -> Result<Self, EngineError> {
        let hierarchy = service_def.resource_hierarchy();
        for repo in repositories.values() {
            for evaluator in repo.evaluators() {
                validate_policy_hierarchy(evaluator.policy(), hierarchy)?;
            }
        }
        if let Some(tag_repo) = &tag_policy_repository {
            for evaluator in tag_repo.evaluators() {
                validate_policy_hierarchy(evaluator.policy(), hierarchy)?;
            }
        }

        Ok(Self {
            policy_version,
            role_version,
            repository_by_zone: repositories.into_iter().map(|(z, r)| (z, Arc::new(r))).collect(),
            tag_policy_repository: tag_policy_repository.map(Arc::new),
            service_def: Arc::new(service_def),
            zone_index: Arc::new(zone_index),
            roles: Arc::new(roles),
        })
    }

    /// The monotone policy version this snapshot was built at.
    #[must_use]
    pub fn policy_version(&self) -> i64 {
        self.policy_version
    }

    /// The monotone role version this snapshot was built at.
    #[must_use]
    pub fn role_version(&self) -> i64 {
        self.role_version
    }

    /// The repository for `zone_name` (empty = default zone), if any
    /// policies are scoped to it.
    #[must_use]
    pub fn repository_for_zone(&self, zone_name: &str) -> Option<&PolicyRepository> {
        self.repository_by_zone.get(zone_name).map(AsRef::as_ref)
    }

    /// The tag-policy repository, if tag policies are configured.
    #[must_use]
    pub fn tag_policy_repository(&self) -> Option<&PolicyRepository> {
        self.tag_policy_repository.as_deref()
    }

    /// The service definition this snapshot evaluates against.
    #[must_use]
    pub fn service_def(&self) -> &ServiceDef {
        &self.service_def
    }

    /// The zone index for resolving a resource's containing zone(s).
    #[must_use]
    pub fn zone_index(&self) -> &ZoneIndex {
        &self.zone_index
    }

    /// The roles table.
    #[must_use]
    pub fn roles(&self) -> &RolesTable {
        &self.roles
    }

    /// Produce a copy of this snapshot with its roles table replaced.
    ///
    /// Used by the admin façade's `set_roles`, the one mutation path the
    /// spec allows outside `with_delta`: swap the pointer under the write
    /// guard rather than mutating `self.roles` in place.
    #[must_use]
    pub fn with_roles(&self, roles: RolesTable) -> PolicyEngine {
        PolicyEngine {
            role_version: roles.version(),
            roles: Arc::new(roles),
            ..self.clone()
        }
    }

    /// Apply `delta` to this snapshot.
    ///
    /// Returns `Ok(None)` when the delta is a no-op against the current
    /// snapshot (reuse the existing `Arc<PolicyEngine>` — no rebuild
    /// needed). Returns `Ok(Some(new_snapshot))` with unchanged
    /// repositories shared by `Arc` clone and only touched zones rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedDelta`] when `delta` names a policy
    /// version that is not strictly newer than this snapshot's and still
    /// carries changes — applying it would desynchronize the version
    /// counter from the actual content.
    pub fn with_delta(&self, delta: &PolicyDelta) -> Result<Option<PolicyEngine>, EngineError> {
        if delta.is_noop() {
            return Ok(None);
        }

        if delta.policy_version <= self.policy_version {
            return Err(EngineError::MalformedDelta {
                reason: format!(
                    "delta policy_version {} is not newer than current {}",
                    delta.policy_version, self.policy_version
                ),
            });
        }

        for zone in &delta.zone_removals {
            if !self.repository_by_zone.contains_key(zone) {
                return Err(EngineError::MalformedDelta {
                    reason: format!("delta removes unknown zone {zone:?}"),
                });
            }
        }

        let hierarchy = self.service_def.resource_hierarchy();
        for policies in delta.zone_updates.values() {
            for policy in policies {
                validate_policy_hierarchy(policy, hierarchy)?;
            }
        }
        if let Some(policies) = &delta.tag_policies {
            for policy in policies {
                validate_policy_hierarchy(policy, hierarchy)?;
            }
        }

        let mut repository_by_zone = self.repository_by_zone.clone();
        for zone in &delta.zone_removals {
            repository_by_zone.remove(zone);
        }
        for (zone, policies) in &delta.zone_updates {
            repository_by_zone.insert(
                zone.clone(),
                Arc::new(PolicyRepository::new(zone.clone(), policies.clone())),
            );
        }

        let tag_policy_repository = match &delta.tag_policies {
            Some(policies) => Some(Arc::new(PolicyRepository::new("", policies.clone()))),
            None => self.tag_policy_repository.clone(),
        };

        let roles = match &delta.roles {
            Some(roles) => Arc::new(roles.clone()),
            None => Arc::clone(&self.roles),
        };

        Ok(Some(PolicyEngine {
            policy_version: delta.policy_version,
            role_version: delta.role_version.unwrap_or(self.role_version),
            repository_by_zone,
            tag_policy_repository,
            service_def: Arc::clone(&self.service_def),
            zone_index: Arc::clone(&self.zone_index),
            roles,
        }))
    }
}

/// Validate `policy`'s primary and additional resource maps against
/// `hierarchy`.
fn validate_policy_hierarchy(policy: &Policy, hierarchy: &[String]) -> Result<(), EngineError> {
    crate::matcher::validate_hierarchy(&policy.resources, hierarchy)?;
    for extra in &policy.additional_resources {
        crate::matcher::validate_hierarchy(extra, hierarchy)?;
    }
    Ok(())
}
