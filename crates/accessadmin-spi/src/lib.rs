//! Trait boundary to the external collaborators of the access-admin policy
//! evaluator.
//!
//! This crate knows nothing about policies, resources, or zones — those
//! domain types live in `accessadmin-core`. It only defines the shape of
//! the services that core depends on (policy storage, role resolution,
//! perf tracing) plus the sentinel string constants shared across every
//! layer, the same way `zvault-storage` defines `StorageBackend` without
//! knowing what secrets look like.

pub mod auth;
pub mod error;
pub mod perf;
pub mod sentinel;
pub mod store;

pub use auth::{AuthContext, StaticAuthContext};
pub use error::{AuthContextError, StoreError};
pub use perf::{NoopTracer, PerfSpan, PerfTracer};
pub use store::{MemoryServiceStore, ServiceStore, UnavailableServiceStore};
