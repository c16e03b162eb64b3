//! RPC request envelope and request-id generation.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::protocol::value::Value;

/// Process-wide counter feeding [`next_request_id`].
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Immutable request envelope built by the client proxy and consumed by the
/// server dispatcher.
///
/// `parameter_types` and `args` are positional and aligned: `args[i]` carries
/// the value declared as `parameter_types[i]`. Type descriptors are the wire
/// kind names (`"i64"`, `"string"`, ...) or a qualified struct identifier for
/// compound arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Qualified interface identifier, e.g. `"demo.UserService"`.
    pub service_name: String,
    pub method_name: String,
    pub parameter_types: Vec<String>,
    pub args: Vec<Value>,
    pub service_version: Option<String>,
}

impl RpcRequest {
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        parameter_types: Vec<String>,
        args: Vec<Value>,
    ) -> Self {
        RpcRequest {
            service_name: service_name.into(),
            method_name: method_name.into(),
            parameter_types,
            args,
            service_version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }
}

/// Generates a snowflake-style unique request id.
///
/// Upper 32 bits: seconds since the UNIX epoch (valid until 2106).
/// Lower 32 bits: process-wide atomic counter.
///
/// Uniqueness holds across restarts and across threads within one runtime.
/// Relaxed ordering is sufficient since only uniqueness matters, not
/// synchronization.
pub fn next_request_id() -> u64 {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let counter = REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    (timestamp << 32) | (counter & 0xFFFF_FFFF)
}
