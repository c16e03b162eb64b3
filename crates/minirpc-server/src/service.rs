//! Service dispatch seam.
//!
//! Providers implement [`RpcService`] once per exposed interface. An
//! implementation matches on the request's `method_name`, decodes the
//! positional arguments through the [`Value`] bridge and invokes the typed
//! method; there is no runtime reflection anywhere in the dispatch path.

use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::{RpcRequest, Value};

/// Result of a successful invocation: the return value plus its declared
/// static type descriptor, which travels in the response so typed
/// deserializers can reconstruct the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReply {
    pub data: Value,
    pub data_type: String,
}

impl ServiceReply {
    pub fn new(data: Value, data_type: impl Into<String>) -> Self {
        ServiceReply {
            data,
            data_type: data_type.into(),
        }
    }
}

/// One exposed service implementation.
///
/// # Example
///
/// ```
/// use minirpc_common::protocol::{from_value, to_value, RpcRequest};
/// use minirpc_common::{RpcError, RpcResult};
/// use minirpc_server::service::{RpcService, ServiceReply};
///
/// struct EchoService;
///
/// impl RpcService for EchoService {
///     fn invoke(&self, request: &RpcRequest) -> RpcResult<ServiceReply> {
///         match request.method_name.as_str() {
///             "echo" => {
///                 let input: String = from_value(
///                     request.args.first().ok_or_else(|| {
///                         RpcError::Dispatch("echo takes one argument".to_string())
///                     })?,
///                 )?;
///                 Ok(ServiceReply::new(to_value(&input)?, "string"))
///             }
///             other => Err(RpcError::Dispatch(format!("no such method: {other}"))),
///         }
///     }
/// }
/// ```
pub trait RpcService: Send + Sync {
    /// Invokes the method named by the request. Unknown methods and argument
    /// decode failures are dispatch errors; they end up in the response's
    /// `exception` field, not as protocol failures.
    fn invoke(&self, request: &RpcRequest) -> RpcResult<ServiceReply>;
}
