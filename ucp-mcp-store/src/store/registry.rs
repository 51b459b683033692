//! Registry of active checkout sessions.
//!
//! The registry is the single owning component for the process-wide set
//! of open checkouts. The map itself sits behind an async `RwLock` and
//! its critical sections never span an `.await`; each session sits
//! behind its own async `Mutex`, which callers hold for the duration of
//! one state transition. That per-identifier mutex is what serializes
//! concurrent tool calls racing on the same checkout: the lock guard is
//! released on every exit path, including failures, when it drops.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::checkout::{CheckoutId, CheckoutSession};

/// A checkout session shared behind its per-identifier mutation lock.
pub type SharedSession = Arc<Mutex<CheckoutSession>>;

/// Owns the collection of active checkout sessions, keyed by identifier.
///
/// Sessions are never evicted; they live for the process lifetime.
#[derive(Debug, Default)]
pub struct CheckoutRegistry {
    sessions: RwLock<HashMap<CheckoutId, SharedSession>>,
}

impl CheckoutRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new session under a fresh identifier.
    pub async fn create(&self) -> SharedSession {
        let id = CheckoutId::generate();
        let session = Arc::new(Mutex::new(CheckoutSession::new(id.clone())));
        self.sessions.write().await.insert(id.clone(), Arc::clone(&session));
        debug!(checkout_id = %id, "created checkout session");
        session
    }

    /// Returns the session registered under the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CheckoutNotFound`] if no session exists
    /// under the identifier.
    pub async fn get(&self, id: &CheckoutId) -> Result<SharedSession> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::CheckoutNotFound(id.to_string()))
    }

    /// Resolves an optional caller-supplied identifier.
    ///
    /// A known identifier returns the existing session; an unknown one
    /// is an error rather than an implicit create, so a caller can never
    /// silently end up on a different session than the one it named.
    /// With no identifier, a fresh session is created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CheckoutNotFound`] for a supplied-but-unknown
    /// identifier.
    pub async fn get_or_create(&self, id: Option<&CheckoutId>) -> Result<SharedSession> {
        match id {
            Some(id) => self.get(id).await,
            None => Ok(self.create().await),
        }
    }

    /// Returns the number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
