//! Registry contract tests against a real etcd.
//!
//! These tests need an etcd reachable at `http://localhost:2379` and are
//! ignored by default:
//!
//!   cargo test -p minirpc-registry -- --ignored

use minirpc_common::config::RegistryConfig;
use minirpc_common::protocol::ServiceMetaInfo;
use minirpc_registry::{EtcdRegistry, Registry};

fn config() -> RegistryConfig {
    RegistryConfig {
        registry: "etcd".to_string(),
        address: "http://localhost:2379".to_string(),
        timeout: 2000,
    }
}

fn meta(name: &str, port: u16) -> ServiceMetaInfo {
    ServiceMetaInfo::new(name, "1.0", "127.0.0.1", port)
}

#[tokio::test]
#[ignore]
async fn register_then_discover_round_trip() {
    let registry = EtcdRegistry::new();
    registry.init(&config()).await.unwrap();

    let m = meta("etcd.test.RoundTrip", 9301);
    registry.register(&m).await.unwrap();

    let endpoints = registry.discover(&m.service_key()).await.unwrap();
    assert!(endpoints.contains(&m));

    registry.destroy().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn deleted_node_disappears_from_discovery() {
    let registry = EtcdRegistry::new();
    registry.init(&config()).await.unwrap();

    let m = meta("etcd.test.Delete", 9302);
    registry.register(&m).await.unwrap();
    assert!(!registry.discover(&m.service_key()).await.unwrap().is_empty());

    registry.unregister(&m).await.unwrap();
    // the watch clears the cache; give the event a moment to arrive
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let endpoints = registry.discover(&m.service_key()).await.unwrap();
    assert!(!endpoints.contains(&m));

    registry.destroy().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn heartbeat_renews_registered_nodes() {
    let registry = EtcdRegistry::new();
    registry.init(&config()).await.unwrap();

    let m = meta("etcd.test.Heartbeat", 9303);
    registry.register(&m).await.unwrap();
    registry.heartbeat().await.unwrap();

    let endpoints = registry.discover(&m.service_key()).await.unwrap();
    assert!(endpoints.contains(&m));

    registry.destroy().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn unreachable_store_fails_init() {
    let registry = EtcdRegistry::new();
    let bad = RegistryConfig {
        registry: "etcd".to_string(),
        address: "http://127.0.0.1:1".to_string(),
        timeout: 300,
    };
    assert!(registry.init(&bad).await.is_err());
}
