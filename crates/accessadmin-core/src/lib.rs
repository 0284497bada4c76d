//! Delegated-admin and policy-discovery evaluation over a zoned, versioned
//! snapshot of resource-based access policies.
//!
//! [`admin::PolicyAdmin`] is the entry point: it holds a lock-free,
//! swappable [`engine::PolicyEngine`] snapshot and answers delegated-admin
//! read/modify
//! checks and likely/exact-match discovery queries against it. Everything
//! else in this crate is the domain model and evaluation machinery that
//! façade is built from.

pub mod admin;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod policy;
pub mod repository;
pub mod resource;
pub mod roles;
pub mod service_def;
pub mod token_replacer;
pub mod zone_index;

pub use admin::{EngineConfig, PolicyAdmin};
pub use engine::{PolicyDelta, PolicyEngine};
pub use error::{AdminError, EngineError, MatchError};
pub use evaluator::PolicyEvaluator;
pub use matcher::{MatchScope, MatchType};
pub use policy::{Policy, PolicyItem, PolicyItemAccess, PolicyType};
pub use repository::PolicyRepository;
pub use resource::{PolicyResource, ResourceMap, ResourceValue};
pub use roles::{RoleMembers, RolesTable};
pub use service_def::ServiceDef;
pub use zone_index::ZoneIndex;
