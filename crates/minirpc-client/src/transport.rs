//! Per-call TCP transport.
//!
//! Each logical RPC opens a fresh connection, writes one request frame and
//! awaits the first complete response frame; the socket closes when the call
//! returns, on every exit path. With one frame per connection the reply
//! correlates by construction; the header's `request_id` is still populated
//! for a future multiplexing transport over shared connections.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::{next_request_id, RpcRequest, RpcResponse, ServiceMetaInfo};
use minirpc_common::wire::{self, FrameDecoder, Header, MessageBody};

/// Transport settings resolved once per client from the configuration.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Wire id of the configured serializer.
    pub serializer: u8,
    /// Per-call timeout covering connect, send and receive.
    pub timeout: Duration,
}

impl CallOptions {
    pub fn new(serializer: u8, timeout: Duration) -> Self {
        CallOptions {
            serializer,
            timeout,
        }
    }
}

/// Sends `request` to `endpoint` and awaits the response frame.
///
/// Fails with [`RpcError::Timeout`] when the whole exchange does not finish
/// within `options.timeout`; the retry layer above may then re-enter.
pub async fn do_request(
    request: &RpcRequest,
    endpoint: &ServiceMetaInfo,
    options: &CallOptions,
) -> RpcResult<RpcResponse> {
    let timeout_ms = options.timeout.as_millis() as u64;
    tokio::time::timeout(options.timeout, exchange(request, endpoint, options))
        .await
        .map_err(|_| RpcError::Timeout(timeout_ms))?
}

async fn exchange(
    request: &RpcRequest,
    endpoint: &ServiceMetaInfo,
    options: &CallOptions,
) -> RpcResult<RpcResponse> {
    let addr = endpoint.service_address();
    let mut stream = TcpStream::connect(&addr)
        .await
        .map_err(|err| RpcError::Connection(format!("failed to connect to {addr}: {err}")))?;

    let header = Header::request(options.serializer, next_request_id());
    let frame = wire::encode(&header, &MessageBody::Request(request.clone()))?;
    stream
        .write_all(&frame)
        .await
        .map_err(|err| map_io_error(err, "writing request"))?;

    let mut decoder = FrameDecoder::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(reply) = decoder.next_frame()? {
            let message = wire::decode(&reply)?;
            return match message.body {
                MessageBody::Response(response) => Ok(response),
                MessageBody::Request(_) => Err(RpcError::Protocol(
                    "unexpected request frame on client".to_string(),
                )),
            };
        }

        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|err| map_io_error(err, "reading response"))?;
        if n == 0 {
            return Err(RpcError::Connection(format!(
                "{addr}: connection closed before a response arrived"
            )));
        }
        decoder.extend(&chunk[..n]);
    }
}

fn map_io_error(err: std::io::Error, context: &str) -> RpcError {
    match err.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected => {
            RpcError::Connection(format!("{context}: connection lost: {err}"))
        }
        _ => RpcError::Io(err),
    }
}
