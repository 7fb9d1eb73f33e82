//! Identity store abstraction.
//!
//! The gateway never owns user records; the surrounding platform does. The
//! admission path only needs to answer "does this user still exist, and
//! what are their current name/role/organization". That question sits
//! behind a trait so the embedding application can back it with whatever
//! store it uses, while tests and standalone runs use the in-memory
//! variant.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::{ready, BoxFuture};

use super::Identity;

/// Errors from the backing store are opaque to the gateway; they all
/// refuse the connection.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Async identity lookup. `Ok(None)` means the credential's subject no
/// longer exists and the connection must be refused.
pub trait IdentityStore: Send + Sync + 'static {
    fn lookup(&self, user_id: &str) -> BoxFuture<'_, Result<Option<Identity>, StoreError>>;
}

pub type SharedIdentityStore = Arc<dyn IdentityStore>;

/// In-memory identity store for tests and standalone/dev runs.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    users: DashMap<String, Identity>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a roster from a JSON file: an array of identity objects.
    pub fn from_json_file(path: &str) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let roster: Vec<Identity> = serde_json::from_str(&raw)?;
        let store = Self::new();
        for identity in roster {
            store.upsert(identity);
        }
        Ok(store)
    }

    pub fn upsert(&self, identity: Identity) {
        self.users.insert(identity.user_id.clone(), identity);
    }

    /// Simulates account deletion: tokens for this user stop working at
    /// the next connection attempt.
    pub fn remove(&self, user_id: &str) {
        self.users.remove(user_id);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn lookup(&self, user_id: &str) -> BoxFuture<'_, Result<Option<Identity>, StoreError>> {
        let found = self.users.get(user_id).map(|entry| entry.value().clone());
        Box::pin(ready(Ok(found)))
    }
}
