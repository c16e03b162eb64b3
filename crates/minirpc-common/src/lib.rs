//! mini-rpc common types, wire protocol and plugin machinery.
//!
//! This crate carries everything shared between the consumer and provider
//! sides of the framework:
//!
//! - [`protocol`]: request/response envelopes, endpoint records, wire values
//! - [`wire`]: the length-prefixed binary frame format and the stream
//!   reassembler
//! - [`serializer`]: pluggable body serializers (`jdk`, `json`, `kryo`,
//!   `hessian`)
//! - [`spi`]: the named-implementation plugin loader backing every
//!   extension point
//! - [`config`]: the `rpc.*` configuration surface
//! - [`error`]: the [`RpcError`] type used across the workspace
//!
//! # Example
//!
//! ```
//! use minirpc_common::protocol::{next_request_id, RpcRequest, Value};
//! use minirpc_common::wire::{self, Header, MessageBody};
//!
//! let request = RpcRequest::new(
//!     "demo.UserService",
//!     "getUser",
//!     vec!["string".to_string()],
//!     vec![Value::Str("mini-rpc".to_string())],
//! );
//! let header = Header::request(0, next_request_id());
//! let frame = wire::encode(&header, &MessageBody::Request(request)).unwrap();
//! let decoded = wire::decode(&frame).unwrap();
//! assert_eq!(decoded.header.request_id, header.request_id);
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod serializer;
pub mod spi;
pub mod wire;

pub use config::{RegistryConfig, RpcConfig};
pub use error::{RpcError, RpcResult};
pub use protocol::{RpcRequest, RpcResponse, ServiceMetaInfo, Value};
