//! Consumer-side discovery cache.

use parking_lot::RwLock;
use std::collections::HashMap;

use minirpc_common::protocol::ServiceMetaInfo;

/// Discovered endpoint lists keyed by service key.
///
/// An entry holds a definite list (possibly empty) or is absent. The cache is
/// invalidated whole on any watched-node change: recomputation is cheap and a
/// full clear keeps the consistency story simple, so discovery always sees a
/// snapshot at most one change-event old.
#[derive(Default)]
pub struct RegistryCache {
    entries: RwLock<HashMap<String, Vec<ServiceMetaInfo>>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service_key: &str) -> Option<Vec<ServiceMetaInfo>> {
        self.entries.read().get(service_key).cloned()
    }

    pub fn put(&self, service_key: &str, endpoints: Vec<ServiceMetaInfo>) {
        self.entries
            .write()
            .insert(service_key.to_string(), endpoints);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
