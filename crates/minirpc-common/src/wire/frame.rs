//! Stream reassembly.
//!
//! A TCP peer observes a stream of bytes, not messages. [`FrameDecoder`]
//! buffers incoming chunks and cuts them into complete frames: it waits for
//! the 17-byte header, reads `body_length` at offset 13, waits for that many
//! further bytes, emits the contiguous frame and starts over. One frame
//! spread over many reads and many frames in one read both work.

use bytes::{Bytes, BytesMut};

use crate::error::{RpcError, RpcResult};
use crate::wire::{HEADER_LENGTH, MAX_BODY_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Accumulating the fixed-width header.
    ReadHeader,
    /// Header complete; accumulating `body_length` body bytes.
    ReadBody { body_length: usize },
}

/// Two-state reassembler turning a byte stream into frames.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    state: DecodeState,
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder {
            buf: BytesMut::with_capacity(4 * 1024),
            state: DecodeState::ReadHeader,
        }
    }

    /// Appends a chunk as read from the socket.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Cuts the next complete frame off the buffer, if one is available.
    ///
    /// Returns `Ok(None)` when more bytes are needed. An oversized
    /// `body_length` is a protocol error; the connection carrying the stream
    /// must be closed since the frame boundary is no longer trustworthy.
    pub fn next_frame(&mut self) -> RpcResult<Option<Bytes>> {
        loop {
            match self.state {
                DecodeState::ReadHeader => {
                    if self.buf.len() < HEADER_LENGTH {
                        return Ok(None);
                    }
                    let body_length =
                        u32::from_be_bytes(self.buf[13..17].try_into().expect("4 header bytes"))
                            as usize;
                    if body_length > MAX_BODY_LENGTH {
                        return Err(RpcError::Protocol(format!(
                            "frame body of {body_length} bytes exceeds the {MAX_BODY_LENGTH} byte limit"
                        )));
                    }
                    self.state = DecodeState::ReadBody { body_length };
                }
                DecodeState::ReadBody { body_length } => {
                    let frame_length = HEADER_LENGTH + body_length;
                    if self.buf.len() < frame_length {
                        return Ok(None);
                    }
                    let frame = self.buf.split_to(frame_length).freeze();
                    self.state = DecodeState::ReadHeader;
                    return Ok(Some(frame));
                }
            }
        }
    }

    /// Bytes buffered but not yet emitted as a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
