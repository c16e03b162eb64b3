//! JSON serializer.
//!
//! JSON erases the static type of every value: a decoded argument is just a
//! loose JSON tree. After decoding, each argument position is therefore
//! re-coerced into the wire kind named by `parameter_types[i]`, and response
//! data is re-coerced under `data_type`. The binary serializers carry the
//! tagged kinds natively and skip this pass entirely.

use serde::{Deserialize, Serialize};

use crate::error::{RpcError, RpcResult};
use crate::protocol::{coerce_json, RpcException, RpcRequest, RpcResponse, Value};
use crate::serializer::Serializer;

/// Loose-JSON wire form of a request.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonRequest {
    service_name: String,
    method_name: String,
    parameter_types: Vec<String>,
    args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_version: Option<String>,
}

/// Loose-JSON wire form of a response.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_type: Option<String>,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exception: Option<RpcException>,
}

pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize_request(&self, request: &RpcRequest) -> RpcResult<Vec<u8>> {
        let wire = JsonRequest {
            service_name: request.service_name.clone(),
            method_name: request.method_name.clone(),
            parameter_types: request.parameter_types.clone(),
            args: request.args.iter().map(Value::to_json).collect(),
            service_version: request.service_version.clone(),
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    fn deserialize_request(&self, bytes: &[u8]) -> RpcResult<RpcRequest> {
        let wire: JsonRequest = serde_json::from_slice(bytes)?;
        if wire.args.len() != wire.parameter_types.len() {
            return Err(RpcError::Serialization(format!(
                "request has {} args but {} parameter types",
                wire.args.len(),
                wire.parameter_types.len()
            )));
        }
        let args = wire
            .args
            .into_iter()
            .zip(&wire.parameter_types)
            .map(|(loose, descriptor)| coerce_json(loose, descriptor))
            .collect::<RpcResult<Vec<_>>>()?;
        Ok(RpcRequest {
            service_name: wire.service_name,
            method_name: wire.method_name,
            parameter_types: wire.parameter_types,
            args,
            service_version: wire.service_version,
        })
    }

    fn serialize_response(&self, response: &RpcResponse) -> RpcResult<Vec<u8>> {
        let wire = JsonResponse {
            data: response.data.as_ref().map(Value::to_json),
            data_type: response.data_type.clone(),
            message: response.message.clone(),
            exception: response.exception.clone(),
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    fn deserialize_response(&self, bytes: &[u8]) -> RpcResult<RpcResponse> {
        let wire: JsonResponse = serde_json::from_slice(bytes)?;
        let data = match (wire.data, wire.data_type.as_deref()) {
            (Some(loose), Some(descriptor)) => Some(coerce_json(loose, descriptor)?),
            (Some(_), None) => {
                return Err(RpcError::Serialization(
                    "response data present without dataType".to_string(),
                ))
            }
            (None, _) => None,
        };
        Ok(RpcResponse {
            data,
            data_type: wire.data_type,
            message: wire.message,
            exception: wire.exception,
        })
    }
}
