//! Provider side of mini-rpc.
//!
//! - [`service`]: the [`RpcService`](service::RpcService) dispatch trait
//!   implemented once per exposed interface
//! - [`local_registry`]: the process-local service table consulted on every
//!   inbound request
//! - [`tcp`]: the accept loop, stream reassembly and response framing
//! - [`server`]: the [`RpcServer`](server::RpcServer) bootstrap tying
//!   configuration, registry session and listener together

pub mod local_registry;
pub mod server;
pub mod service;
pub mod tcp;

pub use local_registry::LocalRegistry;
pub use server::RpcServer;
pub use service::{RpcService, ServiceReply};
pub use tcp::TcpServer;
