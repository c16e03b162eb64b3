//! Binary serializers.
//!
//! All three carry the tagged [`Value`](crate::protocol::Value) variants
//! natively, so no type re-coercion pass is needed after decoding.

use crate::error::RpcResult;
use crate::protocol::{RpcRequest, RpcResponse};
use crate::serializer::Serializer;

/// Native object-graph binary via `bincode`. Wire name `jdk`, the default.
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn name(&self) -> &'static str {
        "jdk"
    }

    fn serialize_request(&self, request: &RpcRequest) -> RpcResult<Vec<u8>> {
        Ok(bincode::serialize(request)?)
    }

    fn deserialize_request(&self, bytes: &[u8]) -> RpcResult<RpcRequest> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn serialize_response(&self, response: &RpcResponse) -> RpcResult<Vec<u8>> {
        Ok(bincode::serialize(response)?)
    }

    fn deserialize_response(&self, bytes: &[u8]) -> RpcResult<RpcResponse> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Compact varint binary via `postcard`. Wire name `kryo`.
pub struct PostcardSerializer;

impl Serializer for PostcardSerializer {
    fn name(&self) -> &'static str {
        "kryo"
    }

    fn serialize_request(&self, request: &RpcRequest) -> RpcResult<Vec<u8>> {
        Ok(postcard::to_allocvec(request)?)
    }

    fn deserialize_request(&self, bytes: &[u8]) -> RpcResult<RpcRequest> {
        Ok(postcard::from_bytes(bytes)?)
    }

    fn serialize_response(&self, response: &RpcResponse) -> RpcResult<Vec<u8>> {
        Ok(postcard::to_allocvec(response)?)
    }

    fn deserialize_response(&self, bytes: &[u8]) -> RpcResult<RpcResponse> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

/// MessagePack compact binary via `rmp-serde`. Wire name `hessian`.
pub struct MessagePackSerializer;

impl Serializer for MessagePackSerializer {
    fn name(&self) -> &'static str {
        "hessian"
    }

    fn serialize_request(&self, request: &RpcRequest) -> RpcResult<Vec<u8>> {
        Ok(rmp_serde::to_vec(request)?)
    }

    fn deserialize_request(&self, bytes: &[u8]) -> RpcResult<RpcRequest> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    fn serialize_response(&self, response: &RpcResponse) -> RpcResult<Vec<u8>> {
        Ok(rmp_serde::to_vec(response)?)
    }

    fn deserialize_response(&self, bytes: &[u8]) -> RpcResult<RpcResponse> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
