//! Endpoint selection.
//!
//! A load balancer picks one endpoint from the discovered candidate set per
//! call. The request context is an open property bag; the proxy populates
//! [`METHOD_NAME_KEY`] and implementations may read it (the consistent-hash
//! balancer hashes the whole context).

pub mod consistent_hash;
pub mod random;
pub mod round_robin;

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use minirpc_common::error::RpcResult;
use minirpc_common::protocol::ServiceMetaInfo;
use minirpc_common::spi::SpiRegistry;

pub use consistent_hash::{ConsistentHashLoadBalancer, VIRTUAL_NODE_NUM};
pub use random::RandomLoadBalancer;
pub use round_robin::RoundRobinLoadBalancer;

/// Property bag handed to [`LoadBalancer::select`].
pub type RequestContext = HashMap<String, String>;

/// Context key under which the proxy stores the invoked method name.
pub const METHOD_NAME_KEY: &str = "methodName";

pub trait LoadBalancer: Send + Sync {
    /// Picks one endpoint from `candidates`, or `None` when the set is
    /// empty. Callers translate `None` into a failure.
    fn select(
        &self,
        context: &RequestContext,
        candidates: &[ServiceMetaInfo],
    ) -> Option<ServiceMetaInfo>;
}

/// Interface identifier used by descriptor files.
pub const LOAD_BALANCER_INTERFACE: &str = "minirpc.loadbalancer.LoadBalancer";

static LOAD_BALANCERS: Lazy<SpiRegistry<dyn LoadBalancer>> = Lazy::new(|| {
    SpiRegistry::new(
        LOAD_BALANCER_INTERFACE,
        include_str!("../../resources/spi/system/minirpc.loadbalancer.LoadBalancer"),
        &[
            ("minirpc.loadbalancer.RoundRobinLoadBalancer", || {
                Arc::new(RoundRobinLoadBalancer::new()) as Arc<dyn LoadBalancer>
            }),
            ("minirpc.loadbalancer.RandomLoadBalancer", || {
                Arc::new(RandomLoadBalancer) as Arc<dyn LoadBalancer>
            }),
            ("minirpc.loadbalancer.ConsistentHashLoadBalancer", || {
                Arc::new(ConsistentHashLoadBalancer) as Arc<dyn LoadBalancer>
            }),
        ],
    )
});

/// Resolves a load balancer by configuration name.
pub fn for_name(name: &str) -> RpcResult<Arc<dyn LoadBalancer>> {
    LOAD_BALANCERS.get(name)
}

/// Applies user descriptor overrides for the load balancer interface.
pub fn load_custom_descriptors(dir: &Path) {
    LOAD_BALANCERS.load_custom_dir(dir);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn candidates(ports: &[u16]) -> Vec<ServiceMetaInfo> {
        ports
            .iter()
            .map(|port| ServiceMetaInfo::new("demo.UserService", "1.0", "127.0.0.1", *port))
            .collect()
    }

    pub fn context_for(method: &str) -> RequestContext {
        let mut context = RequestContext::new();
        context.insert(METHOD_NAME_KEY.to_string(), method.to_string());
        context
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{candidates, context_for};
    use super::*;

    #[test]
    fn test_every_balancer_returns_a_candidate() {
        let candidates = candidates(&[9001, 9002, 9003]);
        let context = context_for("getUser");
        for name in ["roundRobin", "random", "consistentHash"] {
            let balancer = for_name(name).unwrap();
            for _ in 0..20 {
                let selected = balancer.select(&context, &candidates).unwrap();
                assert!(candidates.contains(&selected), "{name} left the set");
            }
        }
    }

    #[test]
    fn test_every_balancer_handles_empty_candidates() {
        let context = context_for("getUser");
        for name in ["roundRobin", "random", "consistentHash"] {
            let balancer = for_name(name).unwrap();
            assert!(balancer.select(&context, &[]).is_none(), "{name}");
        }
    }

    #[test]
    fn test_unknown_balancer_is_plugin_not_found() {
        assert!(matches!(
            for_name("leastConnections"),
            Err(minirpc_common::RpcError::PluginNotFound { .. })
        ));
    }
}
