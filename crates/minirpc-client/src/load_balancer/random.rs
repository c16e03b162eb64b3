//! Uniform random selection.

use rand::Rng;

use minirpc_common::protocol::ServiceMetaInfo;

use crate::load_balancer::{LoadBalancer, RequestContext};

pub struct RandomLoadBalancer;

impl LoadBalancer for RandomLoadBalancer {
    fn select(
        &self,
        _context: &RequestContext,
        candidates: &[ServiceMetaInfo],
    ) -> Option<ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..candidates.len());
        Some(candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::{candidates, context_for};

    #[test]
    fn test_selection_stays_in_set() {
        let balancer = RandomLoadBalancer;
        let candidates = candidates(&[9001, 9002, 9003]);
        let context = context_for("getUser");
        for _ in 0..100 {
            let selected = balancer.select(&context, &candidates).unwrap();
            assert!(candidates.contains(&selected));
        }
    }

    #[test]
    fn test_eventually_covers_all_candidates() {
        let balancer = RandomLoadBalancer;
        let candidates = candidates(&[9001, 9002]);
        let context = context_for("getUser");

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(balancer.select(&context, &candidates).unwrap().service_port);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_empty_candidates() {
        assert!(RandomLoadBalancer.select(&context_for("m"), &[]).is_none());
    }
}
