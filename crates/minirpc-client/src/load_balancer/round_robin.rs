//! Round-robin selection.

use std::sync::atomic::{AtomicUsize, Ordering};

use minirpc_common::protocol::ServiceMetaInfo;

use crate::load_balancer::{LoadBalancer, RequestContext};

/// Monotonic counter modulo the candidate count; ties broken by input order.
///
/// The counter lives on the SPI singleton, so it is shared across every call
/// made through the same configuration.
pub struct RoundRobinLoadBalancer {
    counter: AtomicUsize,
}

impl RoundRobinLoadBalancer {
    pub fn new() -> Self {
        RoundRobinLoadBalancer {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinLoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for RoundRobinLoadBalancer {
    fn select(
        &self,
        _context: &RequestContext,
        candidates: &[ServiceMetaInfo],
    ) -> Option<ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[index].clone())
    }
}
