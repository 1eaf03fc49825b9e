//! Per-session defaults store.
//!
//! The store is the only shared mutable state of a session. It is never read
//! destructively: [`DefaultsStore::get`] hands out an independent snapshot, and
//! every change goes through a merge.

use crate::types::SessionDefaults;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, mergeable [`SessionDefaults`] for one session.
///
/// Cloning the store yields another handle to the *same* defaults.
#[derive(Debug, Clone, Default)]
pub struct DefaultsStore {
    inner: Arc<RwLock<SessionDefaults>>,
}

impl DefaultsStore {
    /// Create a store holding `defaults`
    pub fn new(defaults: SessionDefaults) -> Self {
        DefaultsStore {
            inner: Arc::new(RwLock::new(defaults)),
        }
    }

    /// Independent copy of the current defaults.
    pub fn get(&self) -> SessionDefaults {
        self.inner.read().clone()
    }

    /// Merge `partial` into the stored defaults.
    pub fn merge(&self, partial: SessionDefaults) {
        self.inner.write().merge(partial);
    }

    /// Current value of a default header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<String> {
        self.inner.read().headers.get(name).map(str::to_owned)
    }

    /// Set a default header only if no value exists yet.
    ///
    /// The check and the insert happen under one write lock, so of several
    /// concurrent callers exactly one succeeds. Returns whether the value was stored.
    pub fn set_header_if_absent(&self, name: &str, value: &str) -> bool {
        let mut defaults = self.inner.write();
        if defaults.headers.contains(name) {
            return false;
        }
        defaults.headers.insert(name, value);
        true
    }
}
