//! Binary wire protocol.
//!
//! Every message is one frame: a fixed 17-byte header followed by a body of
//! exactly `body_length` bytes.
//!
//! | Offset | Bytes | Field        | Semantics                                  |
//! |--------|-------|--------------|--------------------------------------------|
//! | 0      | 1     | magic        | Constant `0x01`, rejected on mismatch      |
//! | 1      | 1     | version      | Constant `0x01`                            |
//! | 2      | 1     | serializer   | Wire id of the body serializer             |
//! | 3      | 1     | type         | 0 REQUEST, 1 RESPONSE, 2 HEARTBEAT, 3 OTHER|
//! | 4      | 1     | status       | 0 OK, 20 BAD_REQUEST, 50 BAD_RESPONSE      |
//! | 5      | 8     | request id   | Snowflake-style unique id, big-endian      |
//! | 13     | 4     | body length  | Body byte count, big-endian                |
//!
//! The fixed-size header allows two-phase reads without peeking; see
//! [`frame::FrameDecoder`] for the stream reassembler.

pub mod frame;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{RpcError, RpcResult};
use crate::protocol::{RpcRequest, RpcResponse};
use crate::serializer;

pub use frame::FrameDecoder;

pub const PROTOCOL_MAGIC: u8 = 0x01;
pub const PROTOCOL_VERSION: u8 = 0x01;
pub const HEADER_LENGTH: usize = 17;

/// Upper bound on `body_length`; larger frames are a protocol error rather
/// than an allocation.
pub const MAX_BODY_LENGTH: usize = 100 * 1024 * 1024;

/// Message kind carried in header byte 3.
///
/// HEARTBEAT and OTHER are reserved for future use: their encodings are fixed
/// but decoding a body for them is currently unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    Heartbeat,
    Other,
}

impl MessageType {
    pub fn to_wire(self) -> u8 {
        match self {
            MessageType::Request => 0,
            MessageType::Response => 1,
            MessageType::Heartbeat => 2,
            MessageType::Other => 3,
        }
    }

    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(MessageType::Request),
            1 => Some(MessageType::Response),
            2 => Some(MessageType::Heartbeat),
            3 => Some(MessageType::Other),
            _ => None,
        }
    }
}

/// Protocol-level status carried in header byte 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Ok,
    BadRequest,
    BadResponse,
}

impl MessageStatus {
    pub fn to_wire(self) -> u8 {
        match self {
            MessageStatus::Ok => 0,
            MessageStatus::BadRequest => 20,
            MessageStatus::BadResponse => 50,
        }
    }

    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(MessageStatus::Ok),
            20 => Some(MessageStatus::BadRequest),
            50 => Some(MessageStatus::BadResponse),
            _ => None,
        }
    }
}

/// Fixed-width frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: u8,
    pub version: u8,
    pub serializer: u8,
    pub message_type: u8,
    pub status: u8,
    pub request_id: u64,
    pub body_length: u32,
}

impl Header {
    /// Header for an outgoing request frame; `body_length` is filled by
    /// [`encode`].
    pub fn request(serializer: u8, request_id: u64) -> Self {
        Header {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            serializer,
            message_type: MessageType::Request.to_wire(),
            status: MessageStatus::Ok.to_wire(),
            request_id,
            body_length: 0,
        }
    }

    /// Response header derived from the request header: same serializer and
    /// request id, type flipped to RESPONSE, status OK.
    pub fn response_to(request: &Header) -> Self {
        Header {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            serializer: request.serializer,
            message_type: MessageType::Response.to_wire(),
            status: MessageStatus::Ok.to_wire(),
            request_id: request.request_id,
            body_length: 0,
        }
    }
}

/// Decoded message body, keyed by the header's type field.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Request(RpcRequest),
    Response(RpcResponse),
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolMessage {
    pub header: Header,
    pub body: MessageBody,
}

/// Encodes a header and body into one frame.
///
/// The body is serialized with the serializer named by `header.serializer`
/// and `body_length` is set accordingly; the output is exactly
/// `HEADER_LENGTH + body_length` bytes.
pub fn encode(header: &Header, body: &MessageBody) -> RpcResult<Bytes> {
    let serializer = serializer::for_wire_id(header.serializer)?;
    let body_bytes = match body {
        MessageBody::Request(request) => serializer.serialize_request(request)?,
        MessageBody::Response(response) => serializer.serialize_response(response)?,
    };
    if body_bytes.len() > MAX_BODY_LENGTH {
        return Err(RpcError::Protocol(format!(
            "body of {} bytes exceeds the {} byte limit",
            body_bytes.len(),
            MAX_BODY_LENGTH
        )));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LENGTH + body_bytes.len());
    buf.put_u8(header.magic);
    buf.put_u8(header.version);
    buf.put_u8(header.serializer);
    buf.put_u8(header.message_type);
    buf.put_u8(header.status);
    buf.put_u64(header.request_id);
    buf.put_u32(body_bytes.len() as u32);
    buf.extend_from_slice(&body_bytes);
    Ok(buf.freeze())
}

/// Decodes one complete frame.
///
/// The input must contain the whole frame (header plus `body_length` body
/// bytes); the reassembler guarantees this for stream input.
pub fn decode(frame: &[u8]) -> RpcResult<ProtocolMessage> {
    if frame.len() < HEADER_LENGTH {
        return Err(RpcError::Protocol(format!(
            "truncated frame: {} bytes, header needs {}",
            frame.len(),
            HEADER_LENGTH
        )));
    }

    let magic = frame[0];
    if magic != PROTOCOL_MAGIC {
        return Err(RpcError::Protocol(format!("bad magic 0x{magic:02x}")));
    }

    let header = Header {
        magic,
        version: frame[1],
        serializer: frame[2],
        message_type: frame[3],
        status: frame[4],
        request_id: u64::from_be_bytes(frame[5..13].try_into().expect("8 header bytes")),
        body_length: u32::from_be_bytes(frame[13..17].try_into().expect("4 header bytes")),
    };

    let body_end = HEADER_LENGTH + header.body_length as usize;
    if frame.len() < body_end {
        return Err(RpcError::Protocol(format!(
            "truncated frame: {} bytes, expected {}",
            frame.len(),
            body_end
        )));
    }
    let body_bytes = &frame[HEADER_LENGTH..body_end];

    let serializer = serializer::for_wire_id(header.serializer)?;
    let message_type = MessageType::from_wire(header.message_type)
        .ok_or_else(|| RpcError::Protocol(format!("unknown type {}", header.message_type)))?;

    let body = match message_type {
        MessageType::Request => MessageBody::Request(serializer.deserialize_request(body_bytes)?),
        MessageType::Response => {
            MessageBody::Response(serializer.deserialize_response(body_bytes)?)
        }
        MessageType::Heartbeat | MessageType::Other => {
            return Err(RpcError::Protocol(format!(
                "unsupported type {}",
                header.message_type
            )))
        }
    };

    Ok(ProtocolMessage { header, body })
}
