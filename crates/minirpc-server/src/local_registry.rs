//! Process-local service table.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::service::RpcService;

/// Maps service names to their dispatch targets on the provider side.
///
/// Concurrent readers during registration observe either the prior or the
/// new binding, never a partial one.
#[derive(Default)]
pub struct LocalRegistry {
    services: RwLock<HashMap<String, Arc<dyn RpcService>>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service_name: impl Into<String>, service: Arc<dyn RpcService>) {
        self.services.write().insert(service_name.into(), service);
    }

    pub fn get(&self, service_name: &str) -> Option<Arc<dyn RpcService>> {
        self.services.read().get(service_name).cloned()
    }

    pub fn remove(&self, service_name: &str) {
        self.services.write().remove(service_name);
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}
