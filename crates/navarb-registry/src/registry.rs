#![forbid(unsafe_code)]

//! Registry of mounted navigation components.
//!
//! Keyed by component id. A registration says "a component of this kind
//! claims to be mounted". The registry enforces nothing itself; the conflict
//! detector reads it to find violations of the single-owner rule.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use navarb_core::NavigationMode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One mounted component's claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub kind: NavigationMode,
    pub registered_at_ms: u64,
    /// Insertion counter; breaks ties between equal timestamps.
    pub sequence: u64,
    pub metadata: serde_json::Value,
}

impl Registration {
    /// Ordering key for "most recently registered".
    #[must_use]
    pub fn recency(&self) -> (u64, u64) {
        (self.registered_at_ms, self.sequence)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: BTreeMap<String, Registration>,
    next_sequence: u64,
}

/// Shared handle to the component registry.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert or overwrite a registration.
    ///
    /// An empty or whitespace-only id is ignored. Returns whether the
    /// registry changed.
    pub fn register(
        &self,
        id: &str,
        kind: NavigationMode,
        metadata: serde_json::Value,
        now_ms: u64,
    ) -> bool {
        let id = id.trim();
        if id.is_empty() {
            debug!(target: "navarb.registry", "ignoring registration with empty id");
            return false;
        }
        let mut inner = self.lock();
        inner.next_sequence += 1;
        let registration = Registration {
            id: id.to_owned(),
            kind,
            registered_at_ms: now_ms,
            sequence: inner.next_sequence,
            metadata,
        };
        inner.entries.insert(id.to_owned(), registration);
        debug!(target: "navarb.registry", id, kind = %kind, now_ms, "component registered");
        true
    }

    /// Register with a kind given by name. Unknown kinds are ignored.
    pub fn register_raw(
        &self,
        id: &str,
        kind: &str,
        metadata: serde_json::Value,
        now_ms: u64,
    ) -> bool {
        match NavigationMode::parse(kind) {
            Some(kind) => self.register(id, kind, metadata, now_ms),
            None => {
                debug!(target: "navarb.registry", id, kind, "ignoring registration with unknown kind");
                false
            }
        }
    }

    /// Remove a registration. Unknown ids are a no-op.
    pub fn unregister(&self, id: &str) -> Option<Registration> {
        let removed = self.lock().entries.remove(id.trim());
        if removed.is_some() {
            debug!(target: "navarb.registry", id, "component unregistered");
        }
        removed
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Registration> {
        self.lock().entries.get(id.trim()).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id.trim())
    }

    /// All registrations, ordered by recency (oldest first).
    #[must_use]
    pub fn registrations(&self) -> Vec<Registration> {
        let mut all: Vec<Registration> = self.lock().entries.values().cloned().collect();
        all.sort_by_key(Registration::recency);
        all
    }

    /// Registrations of one kind, oldest first.
    #[must_use]
    pub fn by_kind(&self, kind: NavigationMode) -> Vec<Registration> {
        let mut matching: Vec<Registration> = self
            .lock()
            .entries
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect();
        matching.sort_by_key(Registration::recency);
        matching
    }

    #[must_use]
    pub fn count_of(&self, kind: NavigationMode) -> usize {
        self.lock().entries.values().filter(|r| r.kind == kind).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.next_sequence = 0;
    }
}
