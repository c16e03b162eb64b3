//! Consumer bootstrap.
//!
//! [`RpcClient`] is the explicit framework handle on the consumer side. All
//! pluggable parts are resolved from the configuration when the client is
//! built, so a bad plugin key fails here rather than mid-call.

use std::sync::Arc;
use tracing::info;

use minirpc_common::config::RpcConfig;
use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::serializer;
use minirpc_registry::Registry;

use crate::fault::retry::{self, RetryStrategy};
use crate::fault::tolerant::{self, TolerantStrategy};
use crate::load_balancer::{self, LoadBalancer};
use crate::proxy::ServiceProxy;
use crate::transport::CallOptions;

pub struct RpcClient {
    config: RpcConfig,
    registry: Arc<dyn Registry>,
    load_balancer: Arc<dyn LoadBalancer>,
    retry: Arc<dyn RetryStrategy>,
    tolerant: Arc<dyn TolerantStrategy>,
    serializer_id: u8,
}

impl RpcClient {
    /// Creates a consumer handle with the registry backend named in the
    /// configuration.
    pub async fn new(config: RpcConfig) -> RpcResult<Self> {
        let registry = minirpc_registry::for_name(&config.registry_config.registry)?;
        Self::with_registry(config, registry).await
    }

    /// Creates a consumer handle around an explicit registry instance.
    pub async fn with_registry(config: RpcConfig, registry: Arc<dyn Registry>) -> RpcResult<Self> {
        registry.init(&config.registry_config).await?;

        // resolve the serializer eagerly so both the instance and its wire id
        // are known to exist
        serializer::for_name(&config.serializer)?;
        let serializer_id = serializer::wire_id_for_name(&config.serializer).ok_or_else(|| {
            RpcError::PluginNotFound {
                interface: serializer::SERIALIZER_INTERFACE.to_string(),
                key: config.serializer.clone(),
            }
        })?;

        let load_balancer = load_balancer::for_name(&config.load_balancer)?;
        let retry = retry::for_name(&config.retry_strategy)?;
        let tolerant = tolerant::for_name(&config.tolerant_strategy)?;

        info!(
            serializer = %config.serializer,
            load_balancer = %config.load_balancer,
            retry = %config.retry_strategy,
            tolerant = %config.tolerant_strategy,
            "rpc client ready"
        );

        Ok(RpcClient {
            config,
            registry,
            load_balancer,
            retry,
            tolerant,
            serializer_id,
        })
    }

    /// Proxy for `service_name` under the configured default version.
    pub fn proxy(&self, service_name: &str) -> ServiceProxy {
        self.proxy_versioned(service_name, &self.config.version)
    }

    /// Proxy for `service_name` under an explicit version.
    pub fn proxy_versioned(&self, service_name: &str, version: &str) -> ServiceProxy {
        ServiceProxy::new(
            service_name.to_string(),
            version.to_string(),
            self.registry.clone(),
            self.load_balancer.clone(),
            self.retry.clone(),
            self.tolerant.clone(),
            CallOptions::new(self.serializer_id, self.config.request_timeout()),
        )
    }

    /// Closes the registry session.
    pub async fn shutdown(&self) -> RpcResult<()> {
        self.registry.destroy().await
    }
}
