//! Observer pool
//!
//! One shared intersection observer per distinct configuration. Entries are
//! never evicted: configurations are few and elements keep referring to them.

use crate::{IntObsError, ObservationConfig};
use fos_dom::{IntersectionObserverManager, ObserverId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Registry of pooled observers, keyed by [`ObservationConfig::pool_key`]
#[derive(Debug, Default)]
pub struct ObserverPool {
    observers: HashMap<String, ObserverId>,
}

impl ObserverPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the observer for `config`, creating it on first use.
    ///
    /// Lookup and insertion happen under one `&mut` borrow, so two elements
    /// with the same configuration can never end up with different observers.
    pub fn get_or_create(
        &mut self,
        config: &ObservationConfig,
        manager: &mut IntersectionObserverManager,
    ) -> Result<ObserverId, IntObsError> {
        let key = config.pool_key()?;
        match self.observers.entry(key) {
            Entry::Occupied(entry) => {
                tracing::trace!("Reusing pooled observer {:?} for {}", entry.get(), entry.key());
                Ok(*entry.get())
            }
            Entry::Vacant(entry) => {
                let id = manager.create(&config.to_init())?;
                tracing::debug!("Pooled new observer {:?} for {}", id, entry.key());
                entry.insert(id);
                Ok(id)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<ObserverId> {
        self.observers.get(key).copied()
    }

    /// Whether `id` is one of ours (and so reports to the event translator)
    pub fn contains_observer(&self, id: ObserverId) -> bool {
        self.observers.values().any(|&pooled| pooled == id)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
