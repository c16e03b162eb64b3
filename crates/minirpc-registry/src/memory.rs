//! In-process registry.
//!
//! Backs single-process deployments and the test suite. Stores are shared by
//! address, so a provider and a consumer initialized with the same
//! `registryConfig.address` see the same node set, mimicking one external
//! coordination endpoint. Entries carry the same 30-second lease semantics as
//! the etcd backend: without heartbeat renewal they expire and disappear from
//! discovery.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use minirpc_common::config::RegistryConfig;
use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::ServiceMetaInfo;

use crate::{Registry, HEARTBEAT_PERIOD, LEASE_TTL};

/// Simulated coordination endpoints, one store per address.
static STORES: Lazy<Mutex<HashMap<String, Arc<MemoryStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Default)]
struct MemoryStore {
    entries: Mutex<HashMap<String, StoreEntry>>,
}

struct StoreEntry {
    meta: ServiceMetaInfo,
    expires_at: Instant,
}

pub struct MemoryRegistry {
    inner: Arc<MemoryInner>,
    lease_ttl: Duration,
}

struct MemoryInner {
    store: RwLock<Option<Arc<MemoryStore>>>,
    local_keys: RwLock<HashSet<String>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::with_lease_ttl(LEASE_TTL)
    }

    /// Registry with a custom lease TTL, mainly for exercising expiry without
    /// waiting out the production 30 seconds.
    pub fn with_lease_ttl(lease_ttl: Duration) -> Self {
        MemoryRegistry {
            inner: Arc::new(MemoryInner {
                store: RwLock::new(None),
                local_keys: RwLock::new(HashSet::new()),
                tasks: Mutex::new(Vec::new()),
            }),
            lease_ttl,
        }
    }

    fn store(&self) -> RpcResult<Arc<MemoryStore>> {
        self.inner
            .store
            .read()
            .clone()
            .ok_or_else(|| RpcError::Registry("memory registry is not initialized".to_string()))
    }

    fn renew_pass(store: &MemoryStore, keys: &HashSet<String>, lease_ttl: Duration) {
        let now = Instant::now();
        let mut entries = store.entries.lock();
        for key in keys {
            if let Some(entry) = entries.get_mut(key) {
                if entry.expires_at < now {
                    debug!(key, "node expired, skipping renewal");
                    continue;
                }
                entry.expires_at = now + lease_ttl;
            }
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn init(&self, config: &RegistryConfig) -> RpcResult<()> {
        let initialized = self.inner.store.read().is_some();
        if initialized {
            debug!("memory registry already initialized");
            return Ok(());
        }

        let store = STORES
            .lock()
            .entry(config.address.clone())
            .or_default()
            .clone();
        *self.inner.store.write() = Some(store.clone());
        info!(address = %config.address, "memory registry attached");

        let inner = Arc::clone(&self.inner);
        let lease_ttl = self.lease_ttl;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_PERIOD);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let keys = inner.local_keys.read().clone();
                MemoryRegistry::renew_pass(&store, &keys, lease_ttl);
            }
        });
        self.inner.tasks.lock().push(handle);
        Ok(())
    }

    async fn register(&self, meta: &ServiceMetaInfo) -> RpcResult<()> {
        let store = self.store()?;
        let key = meta.service_node_key();
        store.entries.lock().insert(
            key.clone(),
            StoreEntry {
                meta: meta.clone(),
                expires_at: Instant::now() + self.lease_ttl,
            },
        );
        self.inner.local_keys.write().insert(key);
        Ok(())
    }

    async fn unregister(&self, meta: &ServiceMetaInfo) -> RpcResult<()> {
        let store = self.store()?;
        let key = meta.service_node_key();
        store.entries.lock().remove(&key);
        self.inner.local_keys.write().remove(&key);
        Ok(())
    }

    async fn discover(&self, service_key: &str) -> RpcResult<Vec<ServiceMetaInfo>> {
        let store = self.store()?;
        let prefix = format!("{service_key}/");
        let now = Instant::now();

        let mut entries = store.entries.lock();
        entries.retain(|_, entry| entry.expires_at >= now);

        let mut live: Vec<(&String, &StoreEntry)> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .collect();
        // stable candidate order, matching etcd's key-ordered prefix scans
        live.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(live.into_iter().map(|(_, entry)| entry.meta.clone()).collect())
    }

    async fn heartbeat(&self) -> RpcResult<()> {
        let store = self.store()?;
        let keys = self.inner.local_keys.read().clone();
        Self::renew_pass(&store, &keys, self.lease_ttl);
        Ok(())
    }

    async fn destroy(&self) -> RpcResult<()> {
        if let Ok(store) = self.store() {
            let keys: Vec<String> = self.inner.local_keys.write().drain().collect();
            let mut entries = store.entries.lock();
            for key in keys {
                entries.remove(&key);
            }
        }
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        *self.inner.store.write() = None;
        Ok(())
    }
}
