//! etcd-backed registry.
//!
//! Every registered service instance becomes an ephemeral node at
//! `{root}/{serviceNodeKey}` holding a JSON-encoded `ServiceMetaInfo`, bound
//! to a 30-second lease. A crashed provider stops renewing and its nodes
//! vanish on their own; a live one re-announces every node on the heartbeat
//! tick. Discovery runs a prefix query, fills the local cache and installs a
//! watch on every observed node key; any change event clears the whole cache.

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, EventType, GetOptions, PutOptions};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use minirpc_common::config::RegistryConfig;
use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::ServiceMetaInfo;

use crate::cache::RegistryCache;
use crate::{Registry, HEARTBEAT_PERIOD, LEASE_TTL, REGISTRY_ROOT};

pub struct EtcdRegistry {
    inner: Arc<EtcdInner>,
}

struct EtcdInner {
    client: RwLock<Option<Client>>,
    /// Node keys registered by this process, kept for renewal and teardown.
    local_keys: RwLock<HashSet<String>>,
    cache: RegistryCache,
    /// Node keys that already have a watch installed.
    watching: Mutex<HashSet<String>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

fn registry_err(context: &str) -> impl Fn(etcd_client::Error) -> RpcError + '_ {
    move |err| RpcError::Registry(format!("{context}: {err}"))
}

impl EtcdInner {
    fn client(&self) -> RpcResult<Client> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| RpcError::Registry("etcd registry is not initialized".to_string()))
    }

    /// Writes the node under a fresh 30 s lease and returns its key.
    async fn put_with_lease(&self, meta: &ServiceMetaInfo) -> RpcResult<String> {
        let mut client = self.client()?;
        let key = format!("{REGISTRY_ROOT}{}", meta.service_node_key());
        let lease = client
            .lease_grant(LEASE_TTL.as_secs() as i64, None)
            .await
            .map_err(registry_err(&key))?;
        let payload = serde_json::to_vec(meta)
            .map_err(|err| RpcError::Registry(format!("{key}: cannot encode payload: {err}")))?;
        client
            .put(
                key.clone(),
                payload,
                Some(PutOptions::new().with_lease(lease.id())),
            )
            .await
            .map_err(registry_err(&key))?;
        Ok(key)
    }

    /// One renewal pass over the locally tracked node keys.
    ///
    /// A key missing from the store has already expired; it is skipped rather
    /// than resurrected, because a lost-lease node must be re-announced as a
    /// whole by its owner.
    async fn heartbeat_pass(&self) -> RpcResult<()> {
        let keys: Vec<String> = self.local_keys.read().iter().cloned().collect();
        let mut client = self.client()?;
        for key in keys {
            let response = client.get(key.clone(), None).await.map_err(registry_err(&key))?;
            let Some(kv) = response.kvs().first() else {
                debug!(key, "node expired, skipping renewal");
                continue;
            };
            let meta: ServiceMetaInfo = serde_json::from_slice(kv.value())
                .map_err(|err| RpcError::Registry(format!("{key}: invalid payload: {err}")))?;
            self.put_with_lease(&meta).await?;
        }
        Ok(())
    }

    /// Installs a watch on `key` unless one exists. Any DELETE or data change
    /// clears the whole discovery cache.
    fn watch_key(inner: &Arc<EtcdInner>, key: String) {
        if !inner.watching.lock().insert(key.clone()) {
            return;
        }
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            let Ok(mut client) = task_inner.client() else {
                return;
            };
            let (_watcher, mut stream) = match client.watch(key.clone(), None).await {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(key, %err, "failed to install watch");
                    return;
                }
            };
            loop {
                match stream.message().await {
                    Ok(Some(response)) => {
                        for event in response.events() {
                            match event.event_type() {
                                EventType::Delete | EventType::Put => {
                                    debug!(key, "watched node changed, clearing discovery cache");
                                    task_inner.cache.clear();
                                }
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(key, %err, "watch stream failed");
                        break;
                    }
                }
            }
        });
        inner.tasks.lock().push(handle);
    }
}

impl EtcdRegistry {
    pub fn new() -> Self {
        EtcdRegistry {
            inner: Arc::new(EtcdInner {
                client: RwLock::new(None),
                local_keys: RwLock::new(HashSet::new()),
                cache: RegistryCache::new(),
                watching: Mutex::new(HashSet::new()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl Default for EtcdRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for EtcdRegistry {
    async fn init(&self, config: &RegistryConfig) -> RpcResult<()> {
        let initialized = self.inner.client.read().is_some();
        if initialized {
            debug!("etcd registry already initialized");
            return Ok(());
        }

        let options = ConnectOptions::new().with_connect_timeout(config.connect_timeout());
        let client = Client::connect([config.address.as_str()], Some(options))
            .await
            .map_err(|err| {
                RpcError::Registry(format!("cannot reach etcd at {}: {err}", config.address))
            })?;
        *self.inner.client.write() = Some(client);
        info!(address = %config.address, "etcd registry session established");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_PERIOD);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = inner.heartbeat_pass().await {
                    warn!(%err, "heartbeat pass failed");
                }
            }
        });
        self.inner.tasks.lock().push(handle);
        Ok(())
    }

    async fn register(&self, meta: &ServiceMetaInfo) -> RpcResult<()> {
        let key = self.inner.put_with_lease(meta).await?;
        info!(key, "service registered");
        self.inner.local_keys.write().insert(key);
        Ok(())
    }

    async fn unregister(&self, meta: &ServiceMetaInfo) -> RpcResult<()> {
        let key = format!("{REGISTRY_ROOT}{}", meta.service_node_key());
        let mut client = self.inner.client()?;
        client
            .delete(key.clone(), None)
            .await
            .map_err(registry_err(&key))?;
        self.inner.local_keys.write().remove(&key);
        info!(key, "service unregistered");
        Ok(())
    }

    async fn discover(&self, service_key: &str) -> RpcResult<Vec<ServiceMetaInfo>> {
        if let Some(cached) = self.inner.cache.get(service_key) {
            return Ok(cached);
        }

        let prefix = format!("{REGISTRY_ROOT}{service_key}/");
        let mut client = self.inner.client()?;
        let response = client
            .get(prefix.clone(), Some(GetOptions::new().with_prefix()))
            .await
            .map_err(registry_err(&prefix))?;

        let mut endpoints = Vec::with_capacity(response.kvs().len());
        for kv in response.kvs() {
            let key = kv
                .key_str()
                .map_err(|err| RpcError::Registry(format!("{prefix}: non-utf8 key: {err}")))?
                .to_string();
            let meta: ServiceMetaInfo = serde_json::from_slice(kv.value())
                .map_err(|err| RpcError::Registry(format!("{key}: invalid payload: {err}")))?;
            EtcdInner::watch_key(&self.inner, key);
            endpoints.push(meta);
        }

        self.inner.cache.put(service_key, endpoints.clone());
        Ok(endpoints)
    }

    async fn heartbeat(&self) -> RpcResult<()> {
        self.inner.heartbeat_pass().await
    }

    async fn destroy(&self) -> RpcResult<()> {
        info!("etcd registry shutting down");
        let keys: Vec<String> = self.inner.local_keys.write().drain().collect();
        if let Ok(mut client) = self.inner.client() {
            for key in keys {
                client
                    .delete(key.clone(), None)
                    .await
                    .map_err(registry_err(&key))?;
            }
        }
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        *self.inner.client.write() = None;
        self.inner.cache.clear();
        self.inner.watching.lock().clear();
        Ok(())
    }
}
