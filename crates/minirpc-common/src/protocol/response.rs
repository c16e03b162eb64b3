//! RPC response envelope.

use serde::{Deserialize, Serialize};

use crate::protocol::value::Value;

/// Structured failure description carried inside a response when the provider
/// could not complete the invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcException {
    /// Failure class, e.g. `"DispatchError"`.
    pub kind: String,
    pub message: String,
}

impl RpcException {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        RpcException {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Reply envelope.
///
/// `data_type` is the declared static return type descriptor and is always
/// present when `data` is, so typed deserializers can reconstruct the value.
/// A populated `exception` is an application-level failure: the frame that
/// carried it still has protocol status OK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub data: Option<Value>,
    pub data_type: Option<String>,
    pub message: String,
    pub exception: Option<RpcException>,
}

impl RpcResponse {
    /// Successful reply with `message = "ok"`.
    pub fn ok(data: Value, data_type: impl Into<String>) -> Self {
        RpcResponse {
            data: Some(data),
            data_type: Some(data_type.into()),
            message: "ok".to_string(),
            exception: None,
        }
    }

    /// Failed invocation: absent data, the failure summary as message and the
    /// structured cause attached.
    pub fn failure(exception: RpcException) -> Self {
        RpcResponse {
            data: None,
            data_type: None,
            message: exception.message.clone(),
            exception: Some(exception),
        }
    }

    /// Degraded success used by tolerance strategies: the call did not
    /// complete but the caller is handed an absent-data reply instead of an
    /// error.
    pub fn degraded(message: impl Into<String>) -> Self {
        RpcResponse {
            data: None,
            data_type: None,
            message: message.into(),
            exception: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.exception.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response() {
        let response = RpcResponse::ok(Value::I64(42), "i64");
        assert!(response.is_ok());
        assert_eq!(response.message, "ok");
        assert_eq!(response.data, Some(Value::I64(42)));
        assert_eq!(response.data_type.as_deref(), Some("i64"));
    }

    #[test]
    fn test_failure_response() {
        let response = RpcResponse::failure(RpcException::new(
            "DispatchError",
            "no such method: frobnicate",
        ));
        assert!(!response.is_ok());
        assert!(response.data.is_none());
        assert_eq!(response.message, "no such method: frobnicate");
    }

    #[test]
    fn test_degraded_response() {
        let response = RpcResponse::degraded("degraded: all retries failed");
        assert!(response.is_ok());
        assert!(response.data.is_none());
        assert!(response.data_type.is_none());
    }
}
