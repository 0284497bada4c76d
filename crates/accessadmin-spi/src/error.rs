//! Errors surfaced by the external collaborator traits.

/// Errors from a [`crate::store::ServiceStore`] lookup.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store is unreachable or returned a transport-level
    /// failure. Distinct from "not found" — the caller should treat this
    /// conservatively (spec: identical to "old policy absent").
    #[error("policy store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The stored policy failed to deserialize.
    #[error("stored policy {id} is corrupt: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// Errors from an [`crate::auth::AuthContext`] role resolution.
#[derive(Debug, thiserror::Error)]
pub enum AuthContextError {
    /// The auth backend could not be reached.
    #[error("auth context unavailable: {reason}")]
    Unavailable { reason: String },
}
