//! Zone index: resolves which security zones a resource belongs to by the
//! zone's own defining resource pattern.

use std::collections::HashSet;

use crate::error::EngineError;
use crate::matcher::{match_resource_scoped, MatchScope};
use crate::resource::ResourceMap;

/// One zone's defining resource pattern: a zone "owns" every resource its
/// pattern matches (and, under a recursive element, every descendant).
#[derive(Debug, Clone)]
struct ZoneEntry {
    name: String,
    resources: ResourceMap,
}

/// Pre-indexes zones by the resource pattern that defines their
/// boundaries, answering "which zones does this resource belong to" and,
/// for grant/revoke requests, "is there exactly one".
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    entries: Vec<ZoneEntry>,
    tag_associated: HashSet<String>,
}

impl ZoneIndex {
    /// Build an index from `(zone_name, defining_resources)` pairs.
    /// `tag_associated` names the zones whose tag policies are eligible
    /// for resources resolved into them (§4.3's tag-policy zone rule).
    #[must_use]
    pub fn new(entries: Vec<(String, ResourceMap)>, tag_associated: HashSet<String>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, resources)| ZoneEntry { name, resources })
                .collect(),
            tag_associated,
        }
    }

    /// All zone names whose resource pattern contains `resource` (and its
    /// children, if recursive).
    #[must_use]
    pub fn zone_names_for_resource(&self, resource: &ResourceMap, hierarchy: &[String]) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| match_resource_scoped(&e.resources, resource, hierarchy, MatchScope::Any).is_match())
            .map(|e| e.name.clone())
            .collect()
    }

    /// The single zone matching `resource`, for grant/revoke requests that
    /// require an unambiguous target.
    ///
    /// Returns `Ok(None)` when no zone matches (the default zone applies).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AmbiguousZone`] when more than one zone
    /// matches.
    pub fn uniquely_matched_zone_name(
        &self,
        resource: &ResourceMap,
        hierarchy: &[String],
    ) -> Result<Option<String>, EngineError> {
        let mut matches = self.zone_names_for_resource(resource, hierarchy);
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => {
                matches.sort();
                Err(EngineError::AmbiguousZone { candidates: matches })
            }
        }
    }

    /// Whether `zone` is eligible to have tag policies resolved into it
    /// from outside its own tag-policy repository.
    #[must_use]
    pub fn is_tag_associated(&self, zone: &str) -> bool {
        self.tag_associated.contains(zone)
    }
}
