//! Tolerance strategies: the terminal fallback once retries exhaust.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::{RpcRequest, RpcResponse, ServiceMetaInfo};
use minirpc_common::spi::SpiRegistry;

use crate::transport::{self, CallOptions};

/// Everything a strategy may need to act on the failure: the original
/// request, the full candidate set from discovery, the endpoint that failed
/// and the transport options for re-sending.
pub struct ToleranceContext {
    pub request: RpcRequest,
    pub candidates: Vec<ServiceMetaInfo>,
    pub selected: Option<ServiceMetaInfo>,
    pub options: CallOptions,
}

#[async_trait]
pub trait TolerantStrategy: Send + Sync {
    async fn do_tolerant(
        &self,
        context: &ToleranceContext,
        cause: RpcError,
    ) -> RpcResult<RpcResponse>;
}

/// Propagate the failure to the caller immediately. The default.
pub struct FailFastTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailFastTolerantStrategy {
    async fn do_tolerant(
        &self,
        _context: &ToleranceContext,
        cause: RpcError,
    ) -> RpcResult<RpcResponse> {
        Err(cause)
    }
}

/// Swallow the failure and hand back an absent-data reply.
pub struct FailSafeTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailSafeTolerantStrategy {
    async fn do_tolerant(
        &self,
        _context: &ToleranceContext,
        cause: RpcError,
    ) -> RpcResult<RpcResponse> {
        warn!(%cause, "swallowing failure, returning degraded response");
        Ok(RpcResponse::degraded(format!("degraded: {cause}")))
    }
}

/// Try each remaining candidate once before giving up.
pub struct FailOverTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailOverTolerantStrategy {
    async fn do_tolerant(
        &self,
        context: &ToleranceContext,
        cause: RpcError,
    ) -> RpcResult<RpcResponse> {
        let mut last_error = cause;
        for candidate in &context.candidates {
            if context.selected.as_ref() == Some(candidate) {
                continue;
            }
            info!(endpoint = %candidate.service_address(), "failing over");
            match transport::do_request(&context.request, candidate, &context.options).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    warn!(endpoint = %candidate.service_address(), %err, "failover attempt failed");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

/// Wait before the deferred re-attempt made by [`FailBackTolerantStrategy`].
pub const FAILBACK_DELAY: Duration = Duration::from_secs(5);

/// Queue an asynchronous re-attempt and return an absent-data reply
/// immediately. The deferred outcome is only logged.
pub struct FailBackTolerantStrategy;

#[async_trait]
impl TolerantStrategy for FailBackTolerantStrategy {
    async fn do_tolerant(
        &self,
        context: &ToleranceContext,
        cause: RpcError,
    ) -> RpcResult<RpcResponse> {
        let endpoint = match context
            .selected
            .clone()
            .or_else(|| context.candidates.first().cloned())
        {
            Some(endpoint) => endpoint,
            None => return Err(cause),
        };

        let request = context.request.clone();
        let options = context.options.clone();
        tokio::spawn(async move {
            tokio::time::sleep(FAILBACK_DELAY).await;
            match transport::do_request(&request, &endpoint, &options).await {
                Ok(_) => info!(
                    service = %request.service_name,
                    method = %request.method_name,
                    "deferred retry succeeded"
                ),
                Err(err) => warn!(
                    service = %request.service_name,
                    method = %request.method_name,
                    %err,
                    "deferred retry failed"
                ),
            }
        });
        Ok(RpcResponse::degraded(format!("deferred after failure: {cause}")))
    }
}

/// Interface identifier used by descriptor files.
pub const TOLERANT_INTERFACE: &str = "minirpc.fault.tolerant.TolerantStrategy";

static TOLERANT_STRATEGIES: Lazy<SpiRegistry<dyn TolerantStrategy>> = Lazy::new(|| {
    SpiRegistry::new(
        TOLERANT_INTERFACE,
        include_str!("../../resources/spi/system/minirpc.fault.tolerant.TolerantStrategy"),
        &[
            ("minirpc.fault.tolerant.FailFastTolerantStrategy", || {
                Arc::new(FailFastTolerantStrategy) as Arc<dyn TolerantStrategy>
            }),
            ("minirpc.fault.tolerant.FailSafeTolerantStrategy", || {
                Arc::new(FailSafeTolerantStrategy) as Arc<dyn TolerantStrategy>
            }),
            ("minirpc.fault.tolerant.FailOverTolerantStrategy", || {
                Arc::new(FailOverTolerantStrategy) as Arc<dyn TolerantStrategy>
            }),
            ("minirpc.fault.tolerant.FailBackTolerantStrategy", || {
                Arc::new(FailBackTolerantStrategy) as Arc<dyn TolerantStrategy>
            }),
        ],
    )
});

/// Resolves a tolerance strategy by configuration name.
pub fn for_name(name: &str) -> RpcResult<Arc<dyn TolerantStrategy>> {
    TOLERANT_STRATEGIES.get(name)
}

/// Applies user descriptor overrides for the tolerance interface.
pub fn load_custom_descriptors(dir: &Path) {
    TOLERANT_STRATEGIES.load_custom_dir(dir);
}
