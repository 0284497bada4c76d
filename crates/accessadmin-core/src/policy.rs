//! The policy data model: a versioned access-control rule over a resource
//! pattern, scoped to a security zone.

use serde::{Deserialize, Serialize};

use crate::resource::{resource_signature, ResourceMap};

/// The kind of rule a policy carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyType {
    /// Grants/denies access types on a resource.
    Access,
    /// Masks column values for matching principals.
    DataMask,
    /// Filters rows for matching principals.
    RowFilter,
    /// Any value the deserializer doesn't recognize.
    #[serde(other)]
    Unknown,
}

impl Default for PolicyType {
    fn default() -> Self {
        PolicyType::Access
    }
}

/// A single access type grant/deny within a [`PolicyItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyItemAccess {
    /// The access type name (service-def defined, e.g. `select`).
    pub access_type: String,
    /// Whether this access is allowed (`true`) or denied (`false`).
    pub is_allowed: bool,
}

/// One rule within a policy: a set of principals and the access types
/// granted or denied to them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyItem {
    /// User names this item applies to.
    #[serde(default)]
    pub users: Vec<String>,
    /// Group names this item applies to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Role names this item applies to.
    #[serde(default)]
    pub roles: Vec<String>,
    /// The access types this item grants or denies.
    #[serde(default)]
    pub accesses: Vec<PolicyItemAccess>,
}

/// A policy: a resource pattern, a zone, and the item collections relevant
/// to its [`PolicyType`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Unique policy id.
    pub id: i64,
    /// The kind of rule this policy carries.
    #[serde(default)]
    pub policy_type: PolicyType,
    /// The security zone this policy belongs to. Empty denotes the
    /// default zone.
    #[serde(default)]
    pub zone_name: String,
    /// The primary resource pattern.
    #[serde(default)]
    pub resources: ResourceMap,
    /// Additional resource patterns. When non-empty, the caller's
    /// allowed-accesses are restricted to those granted on *every*
    /// resource the policy names (see
    /// [`crate::evaluator::PolicyEvaluator::get_allowed_accesses`]).
    #[serde(default)]
    pub additional_resources: Vec<ResourceMap>,
    /// `ACCESS` policies: items that allow an access type.
    #[serde(default)]
    pub allow: Vec<PolicyItem>,
    /// `ACCESS` policies: items that deny an access type.
    #[serde(default)]
    pub deny: Vec<PolicyItem>,
    /// `ACCESS` policies: items that re-allow an access type otherwise
    /// denied by a broader `deny` item.
    #[serde(default)]
    pub allow_exceptions: Vec<PolicyItem>,
    /// `ACCESS` policies: items that re-deny an access type otherwise
    /// granted by a broader `allow` item.
    #[serde(default)]
    pub deny_exceptions: Vec<PolicyItem>,
    /// `DATAMASK` policies: the masking items.
    #[serde(default)]
    pub data_mask_items: Vec<PolicyItem>,
    /// `ROWFILTER` policies: the row-filtering items.
    #[serde(default)]
    pub row_filter_items: Vec<PolicyItem>,
}

impl Policy {
    /// The canonical resource signature of this policy's resources and
    /// additional resources (see [`resource_signature`]).
    #[must_use]
    pub fn resource_signature(&self) -> String {
        resource_signature(&self.resources, &self.additional_resources)
    }

    /// The item collections relevant to this policy's [`PolicyType`]: all
    /// four for `ACCESS`, one each for `DATAMASK`/`ROWFILTER`, none for
    /// `Unknown`.
    #[must_use]
    pub fn item_collections(&self) -> Vec<&Vec<PolicyItem>> {
        match self.policy_type {
            PolicyType::Access => vec![
                &self.allow,
                &self.deny,
                &self.allow_exceptions,
                &self.deny_exceptions,
            ],
            PolicyType::DataMask => vec![&self.data_mask_items],
            PolicyType::RowFilter => vec![&self.row_filter_items],
            PolicyType::Unknown => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_type_defaults_to_access_when_absent() {
        let json = serde_json::json!({
            "id": 1,
            "resources": {}
        });
        let policy: Policy = serde_json::from_value(json).unwrap();
        assert_eq!(policy.policy_type, PolicyType::Access);
    }

    #[test]
    fn unrecognized_policy_type_deserializes_to_unknown() {
        let json = serde_json::json!({
            "id": 1,
            "policyType": "TOPSECRET",
            "resources": {}
        });
        let policy: Policy = serde_json::from_value(json).unwrap();
        assert_eq!(policy.policy_type, PolicyType::Unknown);
        assert!(policy.item_collections().is_empty());
    }

    #[test]
    fn access_policy_exposes_all_four_item_collections() {
        let policy = Policy {
            policy_type: PolicyType::Access,
            ..Default::default()
        };
        assert_eq!(policy.item_collections().len(), 4);
    }
}
