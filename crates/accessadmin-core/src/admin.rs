//! The policy admin façade: delegated-admin checks and policy discovery
//! over a lock-free, swappable [`PolicyEngine`] snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use accessadmin_spi::sentinel::ANY_ACCESS;
use accessadmin_spi::{AuthContext, NoopTracer, PerfSpan, PerfTracer, ServiceStore};
use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::engine::{PolicyDelta, PolicyEngine};
use crate::error::AdminError;
use crate::matcher::{match_resource_scoped, MatchScope};
use crate::policy::Policy;
use crate::repository::PolicyRepository;
use crate::resource::ResourceMap;
use crate::roles::RolesTable;
use crate::service_def::{get_all_access_types, get_all_modified_access_types, ServiceDef};
use crate::token_replacer::{expand_for_admin, MacroTokenReplacer};

/// Engine-level runtime configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Whether concurrent writers are serialized against one another.
    ///
    /// Readers never take a lock either way — [`PolicyAdmin::snapshot`] is
    /// always a single atomic pointer load via `ArcSwap`. When `true`, a
    /// writer (`apply_delta`/`set_roles`) acquires a mutex around its
    /// read-modify-write cycle so two concurrent writers can't race and
    /// silently drop one another's update. When `false`, that guard
    /// acquisition is skipped entirely — the writer races the bare
    /// `ArcSwap`, acceptable only when the caller already guarantees a
    /// single writer.
    pub locking_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { locking_enabled: true }
    }
}

/// Coordinates snapshot swapping and delegated-admin/discovery evaluation
/// over one service's policies.
pub struct PolicyAdmin<S, A, T = NoopTracer>
where
    S: ServiceStore<Policy>,
    A: AuthContext,
    T: PerfTracer,
{
    snapshot: ArcSwap<PolicyEngine>,
    write_guard: Mutex<()>,
    config: EngineConfig,
    store: S,
    auth: A,
    tracer: T,
}

impl<S, A, T> PolicyAdmin<S, A, T>
where
    S: ServiceStore<Policy>,
    A: AuthContext,
    T: PerfTracer,
{
    /// Build an admin façade around an initial snapshot.
    pub fn new(engine: PolicyEngine, store: S, auth: A, tracer: T, config: EngineConfig) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(engine),
            write_guard: Mutex::new(()),
            config,
            store,
            auth,
            tracer,
        }
    }

    /// The current snapshot. Lock-free: a single atomic pointer load.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicyEngine> {
        let span = self.tracer.begin("policy_admin.snapshot");
        let snapshot = self.snapshot.load_full();
        span.log();
        snapshot
    }

    /// The current policy version.
    #[must_use]
    pub fn policy_version(&self) -> i64 {
        self.snapshot().policy_version()
    }

    /// The current role version.
    #[must_use]
    pub fn role_version(&self) -> i64 {
        self.snapshot().role_version()
    }

    /// Whether `(user, groups, accessTypes)` are authorized on `resource`
    /// within `zone_name` (empty = default zone), by some combination of
    /// the zone's delegated-admin policies.
    pub async fn is_delegated_admin_access_allowed(
        &self,
        resource: &ResourceMap,
        zone_name: &str,
        user: &str,
        groups: &[String],
        access_types: &HashSet<String>,
    ) -> bool {
        let snapshot = self.snapshot();
        let Some(repo) = snapshot.repository_for_zone(zone_name) else {
            tracing::debug!(zone = zone_name, "no repository for zone");
            return false;
        };
        let service_def = snapshot.service_def();
        let hierarchy = service_def.resource_hierarchy();
        let roles = self.resolve_roles(user, groups).await;

        let allowed = union_allowed_accesses(repo, resource, hierarchy, user, groups, &roles, access_types, service_def);
        access_types.is_subset(&allowed)
    }

    /// Whether `(user, groups)` may *read* `policy` — permissive: any one
    /// of the policy's implied access types is enough.
    pub async fn is_delegated_admin_access_allowed_for_read(&self, policy: &Policy, user: &str, groups: &[String]) -> bool {
        let snapshot = self.snapshot();
        let Some(repo) = snapshot.repository_for_zone(&policy.zone_name) else {
            tracing::debug!(zone = policy.zone_name, "no repository for zone");
            return false;
        };
        let service_def = snapshot.service_def();
        let roles = self.resolve_roles(user, groups).await;
        let access_types = get_all_access_types(policy, service_def);

        is_delegated_admin_access_allowed_for_policy(
            repo,
            policy,
            true,
            user,
            groups,
            &roles,
            &access_types,
            service_def.resource_hierarchy(),
            service_def,
        )
    }

    /// Whether `(user, groups)` may install `new_policy`, running the
    /// two/three-phase modify check against the stored prior version.
    pub async fn is_delegated_admin_access_allowed_for_modify(
        &self,
        new_policy: &Policy,
        user: &str,
        groups: &[String],
    ) -> bool {
        let snapshot = self.snapshot();
        let Some(new_repo) = snapshot.repository_for_zone(&new_policy.zone_name) else {
            tracing::debug!(zone = new_policy.zone_name, "no repository for zone");
            return false;
        };
        let service_def = snapshot.service_def();
        let hierarchy = service_def.resource_hierarchy();
        let roles = self.resolve_roles(user, groups).await;

        let old_policy = match self.store.get_policy(new_policy.id).await {
            Ok(old) => old,
            Err(err) => {
                tracing::warn!(policy_id = new_policy.id, error = %err, "old policy fetch failed; treating as absent");
                None
            }
        };

        match old_policy {
            None => {
                let access_types = get_all_access_types(new_policy, service_def);
                is_delegated_admin_access_allowed_for_policy(
                    new_repo, new_policy, false, user, groups, &roles, &access_types, hierarchy, service_def,
                )
            }
            Some(old_policy) if old_policy.resource_signature() == new_policy.resource_signature() => {
                let delta = get_all_modified_access_types(&old_policy, new_policy, service_def);
                is_delegated_admin_access_allowed_for_policy(
                    new_repo, new_policy, false, user, groups, &roles, &delta, hierarchy, service_def,
                )
            }
            Some(old_policy) => {
                let old_access_types = get_all_access_types(&old_policy, service_def);
                let new_access_types = get_all_access_types(new_policy, service_def);

                let old_ok = match snapshot.repository_for_zone(&old_policy.zone_name) {
                    Some(old_repo) => is_delegated_admin_access_allowed_for_policy(
                        old_repo, &old_policy, false, user, groups, &roles, &old_access_types, hierarchy, service_def,
                    ),
                    None => false,
                };
                let new_ok = is_delegated_admin_access_allowed_for_policy(
                    new_repo, new_policy, false, user, groups, &roles, &new_access_types, hierarchy, service_def,
                );
                old_ok && new_ok
            }
        }
    }

    /// Policies whose resource pattern is an exact cover of `resource`
    /// within `zone_name`.
    #[must_use]
    pub fn get_exact_match_policies(&self, resource: &ResourceMap, zone_name: &str) -> Vec<Policy> {
        let snapshot = self.snapshot();
        let hierarchy = snapshot.service_def().resource_hierarchy();
        match snapshot.repository_for_zone(zone_name) {
            Some(repo) => repo
                .get_exact_match_policies(resource, hierarchy)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every policy (resource and, eligibly, tag) that may apply to
    /// `resource`, across every zone it belongs to.
    ///
    /// Models the spec's synthetic `accessType = ANY` discovery request:
    /// every likely-matching evaluator is returned regardless of which
    /// access type it grants, so no requested-access filter is applied.
    #[must_use]
    pub fn get_matching_policies(&self, resource: &ResourceMap) -> Vec<Policy> {
        tracing::debug!(access_type = ANY_ACCESS, "resolving matching policies for discovery");
        let snapshot = self.snapshot();
        let hierarchy = snapshot.service_def().resource_hierarchy();
        let zone_index = snapshot.zone_index();

        let mut zones = zone_index.zone_names_for_resource(resource, hierarchy);
        if zones.is_empty() {
            zones.push(String::new());
        }

        let mut results = Vec::new();
        for zone in &zones {
            if let Some(repo) = snapshot.repository_for_zone(zone) {
                results.extend(
                    repo.get_likely_match_policy_evaluators(resource, hierarchy, None)
                        .into_iter()
                        .map(|e| e.policy().clone()),
                );
            }
        }

        // Evaluated once against the whole resolved zone set, not once per
        // zone: a resource with two or more non-tag-associated zones would
        // otherwise match the same default-zone tag policies repeatedly.
        if let Some(tag_repo) = snapshot.tag_policy_repository() {
            let tag_associated_zones: HashSet<&str> =
                zones.iter().map(String::as_str).filter(|z| zone_index.is_tag_associated(z)).collect();
            let has_non_tag_associated_zone = zones.iter().any(|z| !zone_index.is_tag_associated(z));
            for e in tag_repo.evaluators() {
                let tag_zone_ok = if e.policy().zone_name.is_empty() {
                    has_non_tag_associated_zone
                } else {
                    tag_associated_zones.contains(e.policy().zone_name.as_str())
                };
                if tag_zone_ok
                    && match_resource_scoped(&e.policy().resources, resource, hierarchy, MatchScope::Any).is_match()
                {
                    results.push(e.policy().clone());
                }
            }
        }
        results
    }

    /// All zones whose resource pattern contains `resource`.
    #[must_use]
    pub fn get_zone_names_for_resource(&self, resource: &ResourceMap) -> Vec<String> {
        let snapshot = self.snapshot();
        let hierarchy = snapshot.service_def().resource_hierarchy();
        snapshot.zone_index().zone_names_for_resource(resource, hierarchy)
    }

    /// The single zone matching `resource`, for grant/revoke requests.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Engine`] (wrapping [`EngineError::AmbiguousZone`])
    /// if more than one zone matches.
    pub fn get_uniquely_matched_zone_name(&self, resource: &ResourceMap) -> Result<Option<String>, AdminError> {
        let snapshot = self.snapshot();
        let hierarchy = snapshot.service_def().resource_hierarchy();
        snapshot
            .zone_index()
            .uniquely_matched_zone_name(resource, hierarchy)
            .map_err(AdminError::from)
    }

    /// Replace the roles table, bumping the role version. Swaps the
    /// snapshot pointer atomically; every other component is shared by
    /// `Arc` clone with the prior snapshot.
    pub fn set_roles(&self, roles: RolesTable) {
        let _guard = self.config.locking_enabled.then(|| self.write_guard.lock());
        let current = self.snapshot.load_full();
        let next = current.with_roles(roles);
        self.snapshot.store(Arc::new(next));
    }

    /// Apply `delta` to the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Engine`] if the delta is malformed or
    /// inconsistent with the current snapshot version; the caller must
    /// trigger a full reload in that case.
    pub fn apply_delta(&self, delta: &PolicyDelta) -> Result<(), AdminError> {
        let _guard = self.config.locking_enabled.then(|| self.write_guard.lock());
        let current = self.snapshot.load_full();
        if let Some(next) = current.with_delta(delta)? {
            self.snapshot.store(Arc::new(next));
        }
        Ok(())
    }

    /// Whether writer calls on this façade serialize against one another.
    #[must_use]
    pub fn locking_enabled(&self) -> bool {
        self.config.locking_enabled
    }

    async fn resolve_roles(&self, user: &str, groups: &[String]) -> HashSet<String> {
        match self.auth.get_roles_for_user_and_groups(user, groups).await {
            Ok(roles) => roles,
            Err(err) => {
                tracing::warn!(user, error = %err, "role resolution failed; proceeding with no roles");
                HashSet::new()
            }
        }
    }
}

/// `isDelegatedAdminAccessAllowedForPolicy`: the shared inner check used
/// by both the read and modify paths, given the access types already
/// resolved for the relevant branch.
fn is_delegated_admin_access_allowed_for_policy(
    repo: &PolicyRepository,
    policy: &Policy,
    is_read: bool,
    user: &str,
    groups: &[String],
    roles: &HashSet<String>,
    access_types: &HashSet<String>,
    hierarchy: &[String],
    service_def: &ServiceDef,
) -> bool {
    let expanded = expand_for_admin(&policy.resources, service_def, &MacroTokenReplacer);
    let mut allowed = union_allowed_accesses(repo, &expanded, hierarchy, user, groups, roles, access_types, service_def);

    for extra in &policy.additional_resources {
        let expanded_extra = expand_for_admin(extra, service_def, &MacroTokenReplacer);
        let extra_allowed =
            union_allowed_accesses(repo, &expanded_extra, hierarchy, user, groups, roles, access_types, service_def);
        allowed = allowed.intersection(&extra_allowed).cloned().collect();
        if allowed.is_empty() {
            break;
        }
    }

    if is_read {
        access_types.intersection(&allowed).next().is_some()
    } else {
        access_types.is_subset(&allowed)
    }
}

/// The union, across likely-matching evaluators, of allowed access types
/// on `resource` — short-circuiting once the union already covers
/// `requested`.
fn union_allowed_accesses(
    repo: &PolicyRepository,
    resource: &ResourceMap,
    hierarchy: &[String],
    user: &str,
    groups: &[String],
    roles: &HashSet<String>,
    requested: &HashSet<String>,
    service_def: &ServiceDef,
) -> HashSet<String> {
    let mut allowed = HashSet::new();
    for evaluator in repo.get_likely_match_policy_evaluators(resource, hierarchy, Some(crate::policy::PolicyType::Access)) {
        allowed.extend(evaluator.get_allowed_accesses(resource, user, groups, roles, requested, hierarchy, service_def));
        if requested.is_subset(&allowed) {
            break;
        }
    }
    allowed
}
