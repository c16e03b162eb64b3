//! Provider bootstrap.
//!
//! [`RpcServer`] is the explicit framework handle on the provider side: it
//! owns the configuration, the registry session and the local service table.
//! The lifecycle is three calls: `new` (bind + registry session), `expose`
//! per service, `serve` to run the accept loop. `shutdown` unregisters every
//! exposed service and destroys the registry session, and must run on the
//! process' shutdown signal so leases do not linger until TTL expiry.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use minirpc_common::config::RpcConfig;
use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::ServiceMetaInfo;
use minirpc_registry::Registry;

use crate::local_registry::LocalRegistry;
use crate::service::RpcService;
use crate::tcp::TcpServer;

pub struct RpcServer {
    config: RpcConfig,
    registry: Arc<dyn Registry>,
    services: Arc<LocalRegistry>,
    /// Bound listener, taken by `serve`.
    listener: Mutex<Option<TcpServer>>,
    advertised_port: u16,
    exposed: Mutex<Vec<ServiceMetaInfo>>,
}

impl RpcServer {
    /// Creates a provider handle with the registry backend named in the
    /// configuration.
    pub async fn new(config: RpcConfig) -> RpcResult<Self> {
        let registry = minirpc_registry::for_name(&config.registry_config.registry)?;
        Self::with_registry(config, registry).await
    }

    /// Creates a provider handle around an explicit registry instance.
    pub async fn with_registry(config: RpcConfig, registry: Arc<dyn Registry>) -> RpcResult<Self> {
        registry.init(&config.registry_config).await?;

        let bind_addr = format!("{}:{}", config.server_host, config.server_port);
        let listener = TcpServer::bind(&bind_addr).await?;
        let advertised_port = listener.local_addr()?.port();

        Ok(RpcServer {
            config,
            registry,
            services: Arc::new(LocalRegistry::new()),
            listener: Mutex::new(Some(listener)),
            advertised_port,
            exposed: Mutex::new(Vec::new()),
        })
    }

    /// Port actually bound; differs from the configured one when that was 0.
    pub fn local_port(&self) -> u16 {
        self.advertised_port
    }

    /// Registers `service` locally for dispatch and announces it in the
    /// remote registry under `{service_name}:{version}`.
    pub async fn expose(
        &self,
        service_name: &str,
        version: &str,
        service: Arc<dyn RpcService>,
    ) -> RpcResult<()> {
        self.services.register(service_name, service);

        let meta = ServiceMetaInfo::new(
            service_name,
            version,
            self.config.server_host.clone(),
            self.advertised_port,
        );
        self.registry.register(&meta).await?;
        info!(service = service_name, version, port = self.advertised_port, "service exposed");
        self.exposed.lock().push(meta);
        Ok(())
    }

    /// Registers `service` under the configured default version.
    pub async fn expose_default(
        &self,
        service_name: &str,
        service: Arc<dyn RpcService>,
    ) -> RpcResult<()> {
        let version = self.config.version.clone();
        self.expose(service_name, &version, service).await
    }

    /// Runs the accept loop until the listener fails. Callable once.
    pub async fn serve(&self) -> RpcResult<()> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or_else(|| RpcError::Config("server is already running".to_string()))?;
        info!(
            host = %self.config.server_host,
            port = self.advertised_port,
            "tcp server started"
        );
        listener.run(self.services.clone()).await
    }

    /// Unregisters every exposed service and closes the registry session.
    pub async fn shutdown(&self) -> RpcResult<()> {
        let exposed: Vec<ServiceMetaInfo> = self.exposed.lock().drain(..).collect();
        for meta in exposed {
            if let Err(err) = self.registry.unregister(&meta).await {
                warn!(node = %meta.service_node_key(), %err, "unregister failed during shutdown");
            }
        }
        self.registry.destroy().await
    }
}
