//! Consumer side of mini-rpc.
//!
//! - [`client`]: the [`RpcClient`](client::RpcClient) bootstrap resolving
//!   every pluggable part from configuration
//! - [`proxy`]: the per-interface [`ServiceProxy`](proxy::ServiceProxy)
//!   running discover → select → retry(send) → tolerate
//! - [`transport`]: the per-call TCP exchange
//! - [`load_balancer`]: round-robin, random and consistent-hash selection
//! - [`fault`]: retry strategies and terminal tolerance strategies
//!
//! # Example
//!
//! ```no_run
//! use minirpc_client::RpcClient;
//! use minirpc_common::config::RpcConfig;
//! use minirpc_common::protocol::Value;
//!
//! # async fn run() -> minirpc_common::RpcResult<()> {
//! let client = RpcClient::new(RpcConfig::default()).await?;
//! let proxy = client.proxy("demo.UserService");
//! let name: String = proxy
//!     .call(
//!         "getUserName",
//!         vec!["i64".to_string()],
//!         vec![Value::I64(1)],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod fault;
pub mod load_balancer;
pub mod proxy;
pub mod transport;

pub use client::RpcClient;
pub use fault::{RetryStrategy, TolerantStrategy};
pub use load_balancer::LoadBalancer;
pub use proxy::ServiceProxy;
pub use transport::CallOptions;
