//! The persistent policy store collaborator.
//!
//! This crate knows nothing about the shape of a policy — that domain type
//! lives in `accessadmin-core`. The trait is generic over it so the
//! boundary stays domain-agnostic, the same way `zvault-storage`'s
//! `StorageBackend` is agnostic to what the encrypted bytes mean.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::StoreError;

/// Lookup of a stored policy by its numeric id.
///
/// Implementations must be safe to share across async tasks.
#[async_trait::async_trait]
pub trait ServiceStore<P>: Send + Sync
where
    P: Clone + Send + Sync + 'static,
{
    /// Fetch the currently persisted version of policy `id`.
    ///
    /// Returns `Ok(None)` if no policy with that id exists — this is the
    /// "creation" case for the modify check, distinct from a store failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store could not be reached or
    /// the stored record is corrupt.
    async fn get_policy(&self, id: i64) -> Result<Option<P>, StoreError>;
}

/// An in-memory [`ServiceStore`], for tests and reference implementations.
#[derive(Debug)]
pub struct MemoryServiceStore<P> {
    policies: RwLock<HashMap<i64, P>>,
}

impl<P> MemoryServiceStore<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the stored policy for `id`.
    pub async fn put(&self, id: i64, policy: P) {
        self.policies.write().await.insert(id, policy);
    }

    /// Remove the stored policy for `id`, if any.
    pub async fn remove(&self, id: i64) {
        self.policies.write().await.remove(&id);
    }
}

impl<P> Default for MemoryServiceStore<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<P> ServiceStore<P> for MemoryServiceStore<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn get_policy(&self, id: i64) -> Result<Option<P>, StoreError> {
        Ok(self.policies.read().await.get(&id).cloned())
    }
}

/// A [`ServiceStore`] that always reports unavailability — useful for
/// exercising the "store fetch failure during modify" path in tests.
#[derive(Debug, Default)]
pub struct UnavailableServiceStore;

#[async_trait::async_trait]
impl<P> ServiceStore<P> for UnavailableServiceStore
where
    P: Clone + Send + Sync + 'static,
{
    async fn get_policy(&self, _id: i64) -> Result<Option<P>, StoreError> {
        Err(StoreError::Unavailable {
            reason: "simulated outage".to_owned(),
        })
    }
}
