//! Service registry abstraction for mini-rpc.
//!
//! Providers announce endpoint records ([`ServiceMetaInfo`]) under a lease;
//! consumers discover live endpoints by service key through a local cache
//! that watched change events invalidate. A crashed provider stops renewing
//! its lease and disappears from discovery without manual cleanup.
//!
//! Backends are resolved by configuration string through the plugin loader:
//! `etcd` (the default, see [`EtcdRegistry`]) and `memory` (in-process, see
//! [`MemoryRegistry`]).

pub mod cache;
pub mod etcd;
pub mod memory;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use minirpc_common::config::RegistryConfig;
use minirpc_common::error::RpcResult;
use minirpc_common::protocol::ServiceMetaInfo;
use minirpc_common::spi::SpiRegistry;

pub use cache::RegistryCache;
pub use etcd::EtcdRegistry;
pub use memory::MemoryRegistry;

/// Root prefix for all registry node paths.
pub const REGISTRY_ROOT: &str = "/rpc/";

/// Lease bound to every registered node.
pub const LEASE_TTL: Duration = Duration::from_secs(30);

/// Period of the renewal task spawned at `init`.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(10);

/// Remote service registry.
///
/// All operations may touch the backing store and are fallible; failures
/// surface as [`RpcError::Registry`](minirpc_common::RpcError::Registry) so
/// the client pipeline can escalate to its tolerance strategy.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Establishes a session to the backing store and starts the heartbeat
    /// task. Fails if the store is unreachable.
    async fn init(&self, config: &RegistryConfig) -> RpcResult<()>;

    /// Creates the ephemeral node for `meta` under a fresh lease and tracks
    /// it locally for renewal and teardown.
    async fn register(&self, meta: &ServiceMetaInfo) -> RpcResult<()>;

    /// Deletes the node for `meta` and drops the local tracking entry.
    async fn unregister(&self, meta: &ServiceMetaInfo) -> RpcResult<()>;

    /// Lists the live endpoints registered under `service_key`. An unknown
    /// key yields an empty list, never an error.
    async fn discover(&self, service_key: &str) -> RpcResult<Vec<ServiceMetaInfo>>;

    /// Runs one lease-renewal pass over the locally tracked nodes. The
    /// background task spawned by `init` calls this every
    /// [`HEARTBEAT_PERIOD`]; it is public so renewal can also be driven
    /// explicitly.
    async fn heartbeat(&self) -> RpcResult<()>;

    /// Deletes all locally tracked nodes and closes the session.
    async fn destroy(&self) -> RpcResult<()>;
}

/// Interface identifier used by descriptor files.
pub const REGISTRY_INTERFACE: &str = "minirpc.registry.Registry";

static REGISTRIES: Lazy<SpiRegistry<dyn Registry>> = Lazy::new(|| {
    SpiRegistry::new(
        REGISTRY_INTERFACE,
        include_str!("../resources/spi/system/minirpc.registry.Registry"),
        &[
            ("minirpc.registry.EtcdRegistry", || {
                Arc::new(EtcdRegistry::new()) as Arc<dyn Registry>
            }),
            ("minirpc.registry.MemoryRegistry", || {
                Arc::new(MemoryRegistry::new()) as Arc<dyn Registry>
            }),
        ],
    )
});

/// Resolves a registry backend by configuration name.
pub fn for_name(name: &str) -> RpcResult<Arc<dyn Registry>> {
    REGISTRIES.get(name)
}

/// Applies user descriptor overrides for the registry interface from `dir`.
pub fn load_custom_descriptors(dir: &Path) {
    REGISTRIES.load_custom_dir(dir);
}
