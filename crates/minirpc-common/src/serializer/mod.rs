//! Pluggable body serializers.
//!
//! A serializer converts request/response envelopes to and from bytes. Four
//! kinds ship with the framework, each with a stable configuration name and a
//! stable small-integer wire id:
//!
//! | Wire id | Name      | Format |
//! |---------|-----------|--------|
//! | 0       | `jdk`     | bincode (native object-graph binary, default) |
//! | 1       | `json`    | serde_json with per-position type re-coercion |
//! | 2       | `kryo`    | postcard (compact varint binary) |
//! | 3       | `hessian` | MessagePack (compact binary) |
//!
//! The id/name mapping is the explicit table below; it is independent of any
//! enumeration order. All implementations are stateless and safe to share
//! across threads.

pub mod binary;
pub mod json;

use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

use crate::error::{RpcError, RpcResult};
use crate::protocol::{RpcRequest, RpcResponse};
use crate::spi::SpiRegistry;

pub use binary::{BincodeSerializer, MessagePackSerializer, PostcardSerializer};
pub use json::JsonSerializer;

/// Converts envelopes to and from bytes.
///
/// Object-safe on purpose: instances are resolved by configuration string
/// through the plugin loader and shared as `Arc<dyn Serializer>`.
pub trait Serializer: Send + Sync {
    /// Stable configuration name (see the module table).
    fn name(&self) -> &'static str;

    fn serialize_request(&self, request: &RpcRequest) -> RpcResult<Vec<u8>>;
    fn deserialize_request(&self, bytes: &[u8]) -> RpcResult<RpcRequest>;
    fn serialize_response(&self, response: &RpcResponse) -> RpcResult<Vec<u8>>;
    fn deserialize_response(&self, bytes: &[u8]) -> RpcResult<RpcResponse>;
}

/// Interface identifier used by descriptor files.
pub const SERIALIZER_INTERFACE: &str = "minirpc.serializer.Serializer";

static SERIALIZERS: Lazy<SpiRegistry<dyn Serializer>> = Lazy::new(|| {
    SpiRegistry::new(
        SERIALIZER_INTERFACE,
        include_str!("../../resources/spi/system/minirpc.serializer.Serializer"),
        &[
            ("minirpc.serializer.BincodeSerializer", || {
                Arc::new(BincodeSerializer) as Arc<dyn Serializer>
            }),
            ("minirpc.serializer.JsonSerializer", || {
                Arc::new(JsonSerializer) as Arc<dyn Serializer>
            }),
            ("minirpc.serializer.PostcardSerializer", || {
                Arc::new(PostcardSerializer) as Arc<dyn Serializer>
            }),
            ("minirpc.serializer.MessagePackSerializer", || {
                Arc::new(MessagePackSerializer) as Arc<dyn Serializer>
            }),
        ],
    )
});

/// Wire id for a configuration name.
pub fn wire_id_for_name(name: &str) -> Option<u8> {
    match name {
        "jdk" => Some(0),
        "json" => Some(1),
        "kryo" => Some(2),
        "hessian" => Some(3),
        _ => None,
    }
}

/// Configuration name for a wire id.
pub fn name_for_wire_id(id: u8) -> Option<&'static str> {
    match id {
        0 => Some("jdk"),
        1 => Some("json"),
        2 => Some("kryo"),
        3 => Some("hessian"),
        _ => None,
    }
}

/// Resolves a serializer by configuration name.
pub fn for_name(name: &str) -> RpcResult<Arc<dyn Serializer>> {
    SERIALIZERS.get(name)
}

/// Resolves a serializer by wire id; unknown ids are a protocol error.
pub fn for_wire_id(id: u8) -> RpcResult<Arc<dyn Serializer>> {
    let name = name_for_wire_id(id)
        .ok_or_else(|| RpcError::Protocol(format!("unknown serializer id {id}")))?;
    for_name(name)
}

/// Applies user descriptor overrides for the serializer interface from `dir`.
pub fn load_custom_descriptors(dir: &Path) {
    SERIALIZERS.load_custom_dir(dir);
}
