//! Consistent-hash selection.
//!
//! Each candidate contributes [`VIRTUAL_NODE_NUM`] virtual nodes at
//! `hash(serviceAddress + "#" + i)`. Selection hashes the request context and
//! walks the ring to the first virtual node with a hash at or above the
//! request hash, wrapping to the smallest entry when none qualifies. The ring
//! is rebuilt per call; the candidate sets involved are small.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use minirpc_common::protocol::ServiceMetaInfo;

use crate::load_balancer::{LoadBalancer, RequestContext};

/// Virtual nodes per candidate.
pub const VIRTUAL_NODE_NUM: usize = 100;

pub struct ConsistentHashLoadBalancer;

impl LoadBalancer for ConsistentHashLoadBalancer {
    fn select(
        &self,
        context: &RequestContext,
        candidates: &[ServiceMetaInfo],
    ) -> Option<ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }
        let ring = build_ring(candidates);
        select_on_ring(&ring, hash_context(context)).cloned()
    }
}

fn build_ring(candidates: &[ServiceMetaInfo]) -> BTreeMap<u64, &ServiceMetaInfo> {
    let mut ring = BTreeMap::new();
    for candidate in candidates {
        for i in 0..VIRTUAL_NODE_NUM {
            let key = hash_str(&format!("{}#{}", candidate.service_address(), i));
            ring.insert(key, candidate);
        }
    }
    ring
}

/// First ring entry with hash >= `request_hash`, wrapping to the smallest.
fn select_on_ring<'a>(
    ring: &BTreeMap<u64, &'a ServiceMetaInfo>,
    request_hash: u64,
) -> Option<&'a ServiceMetaInfo> {
    ring.range(request_hash..)
        .next()
        .or_else(|| ring.iter().next())
        .map(|(_, candidate)| *candidate)
}

/// Hashes the context with its keys in sorted order, so logically equal
/// contexts hash equally regardless of map iteration order.
fn hash_context(context: &RequestContext) -> u64 {
    let mut hasher = DefaultHasher::new();
    let mut keys: Vec<&String> = context.keys().collect();
    keys.sort();
    for key in keys {
        key.hash(&mut hasher);
        context[key].hash(&mut hasher);
    }
    hasher.finish()
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::{candidates, context_for};

    #[test]
    fn test_selection_is_deterministic() {
        let balancer = ConsistentHashLoadBalancer;
        let candidates = candidates(&[9001, 9002, 9003]);
        let context = context_for("getUser");

        let first = balancer.select(&context, &candidates).unwrap();
        for _ in 0..10 {
            assert_eq!(balancer.select(&context, &candidates).unwrap(), first);
        }
    }

    #[test]
    fn test_different_methods_can_differ() {
        let balancer = ConsistentHashLoadBalancer;
        let candidates = candidates(&[9001, 9002, 9003, 9004, 9005]);

        // with five candidates and 500 virtual nodes at least two of these
        // method names land on different endpoints
        let selected: std::collections::HashSet<u16> = ["a", "b", "c", "d", "e", "f", "g", "h"]
            .iter()
            .map(|method| {
                balancer
                    .select(&context_for(method), &candidates)
                    .unwrap()
                    .service_port
            })
            .collect();
        assert!(selected.len() > 1);
    }

    #[test]
    fn test_wraps_to_smallest_ring_entry() {
        let a = ServiceMetaInfo::new("svc", "1.0", "127.0.0.1", 9001);
        let b = ServiceMetaInfo::new("svc", "1.0", "127.0.0.1", 9002);
        let mut ring = BTreeMap::new();
        ring.insert(10u64, &a);
        ring.insert(20u64, &b);

        // request hash above every ring hash wraps to the smallest entry
        assert_eq!(select_on_ring(&ring, u64::MAX), Some(&a));
        // in-range hashes pick the next entry at or above
        assert_eq!(select_on_ring(&ring, 5), Some(&a));
        assert_eq!(select_on_ring(&ring, 10), Some(&a));
        assert_eq!(select_on_ring(&ring, 11), Some(&b));
    }

    #[test]
    fn test_context_hash_ignores_insertion_order() {
        let mut forward = RequestContext::new();
        forward.insert("methodName".to_string(), "getUser".to_string());
        forward.insert("tenant".to_string(), "a".to_string());

        let mut reverse = RequestContext::new();
        reverse.insert("tenant".to_string(), "a".to_string());
        reverse.insert("methodName".to_string(), "getUser".to_string());

        assert_eq!(hash_context(&forward), hash_context(&reverse));
    }

    #[test]
    fn test_ring_size() {
        let candidates = candidates(&[9001, 9002, 9003]);
        let ring = build_ring(&candidates);
        // hash collisions aside, every candidate contributes its full set
        assert!(ring.len() > 2 * VIRTUAL_NODE_NUM);
    }
}
