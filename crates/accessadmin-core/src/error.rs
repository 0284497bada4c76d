//! Per-subsystem error enums, one per architectural layer, wrapped upward
//! by `#[from]` so the admin façade's `Result<_, AdminError>` carries the
//! original cause.

use accessadmin_spi::error::StoreError;
use thiserror::Error;

/// Errors from resource-pattern validation ahead of matching.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A policy (or request) names a resource element the service
    /// definition's hierarchy does not declare (spec §3: "each declared
    /// element name belongs to the service-def's resource hierarchy").
    #[error("resource element {element:?} is not part of the declared hierarchy")]
    UnknownElement { element: String },
}

/// Errors constructing or evolving a [`crate::engine::PolicyEngine`]
/// snapshot.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `cloneWithDelta` was asked to apply a delta this engine cannot
    /// reconcile against its current snapshot (e.g. a removal referencing
    /// a policy id not present, or a zone rename with no prior zone of
    /// that name).
    #[error("malformed policy delta: {reason}")]
    MalformedDelta { reason: String },

    /// A grant/revoke zone lookup matched more than one zone; the caller
    /// must disambiguate rather than apply the change to all of them.
    #[error("resource matches {} zones, expected exactly one: {}", candidates.len(), candidates.join(", "))]
    AmbiguousZone { candidates: Vec<String> },

    /// A policy named in a snapshot build or delta declares a resource
    /// element the service definition's hierarchy does not recognize.
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// The top-level error type returned by [`crate::admin::PolicyAdmin`].
#[derive(Debug, Error)]
pub enum AdminError {
    /// The policy store could not be reached while fetching the
    /// pre-modification policy for the two-phase modify check. Per design,
    /// callers treat this the same as "no prior policy" (conservative:
    /// require full creation-level authorization) rather than failing the
    /// request outright — this variant exists so the decision is still
    /// logged and traceable.
    #[error("policy store unavailable, treating as no prior policy: {reason}")]
    StoreUnavailable { reason: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { reason } => AdminError::StoreUnavailable { reason },
            StoreError::Corrupt { id, reason } => AdminError::StoreUnavailable {
                reason: format!("policy {id} corrupt: {reason}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailable_collapses_corrupt_into_store_unavailable() {
        let err = AdminError::from(StoreError::Corrupt {
            id: 42,
            reason: "bad json".to_owned(),
        });
        assert!(matches!(err, AdminError::StoreUnavailable { .. }));
    }

    #[test]
    fn unknown_hierarchy_element_wraps_into_engine_error() {
        let err = EngineError::from(MatchError::UnknownElement {
            element: "ghost".to_owned(),
        });
        assert!(matches!(err, EngineError::Match(_)));
    }
}
