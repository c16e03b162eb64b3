use thiserror::Error;

/// Error type shared by every mini-rpc crate.
///
/// Errors are classified as retryable or non-retryable:
/// - **Retryable**: transport timeouts, connection failures, raw I/O errors
///   (transient issues, a later attempt may succeed)
/// - **Non-retryable**: protocol violations, serialization failures, dispatch
///   failures, missing plugins (permanent issues)
#[derive(Error, Debug)]
pub enum RpcError {
    /// Malformed frame: bad magic, unknown serializer/type id, truncated
    /// data. Closes the connection, never retried.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A serializer failed to encode or decode a body.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Registration, discovery or watch failure against the backing store.
    #[error("registry error: {0}")]
    Registry(String),

    /// Discovery returned no live endpoints for the service key.
    #[error("no endpoints available for service {0}")]
    NoEndpoints(String),

    /// The per-call timeout elapsed before a response arrived.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Connect/read/write failure on a transport socket.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Server-side method lookup or invocation failure. Carried in the
    /// response body, not a protocol-level failure.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// A configured plugin key resolved to nothing. Configuration-time, fatal.
    #[error("plugin not found: interface {interface}, key {key}")]
    PluginNotFound { interface: String, key: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// A retry strategy gave up after its final attempt.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: String },
}

impl RpcError {
    /// Whether a later attempt at the same call could plausibly succeed.
    ///
    /// Transport-level failures are transient; everything else is permanent
    /// for the current call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RpcError::Timeout(_) | RpcError::Connection(_) | RpcError::Io(_)
        )
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for RpcError {
    fn from(err: bincode::Error) -> Self {
        RpcError::Serialization(err.to_string())
    }
}

impl From<postcard::Error> for RpcError {
    fn from(err: postcard::Error) -> Self {
        RpcError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for RpcError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        RpcError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RpcError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        RpcError::Serialization(err.to_string())
    }
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;
