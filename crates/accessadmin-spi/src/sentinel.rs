//! Sentinel values shared by every layer above this crate.
//!
//! Defined once here so the admin façade, the evaluator, and callers all
//! compare against the same string, never a locally re-typed literal.

/// Pseudo access type substituted whenever an access-type set would
/// otherwise be empty but a meaningful check is still required.
pub const ADMIN_ACCESS: &str = "ADMIN";

/// Access-type marker used by discovery requests that don't care which
/// access type matches, only whether the resource matches at all.
pub const ANY_ACCESS: &str = "ANY";

/// The wildcard token substituted for every macro parameter during
/// delegated-admin evaluation, and the glob wildcard recognized by the
/// resource matcher.
pub const WILDCARD: &str = "*";
