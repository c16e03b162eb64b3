//! TCP server tests over real sockets: partial reads, coalesced frames and
//! protocol violations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use minirpc_common::protocol::{next_request_id, RpcRequest, Value};
use minirpc_common::wire::{self, FrameDecoder, Header, MessageBody};
use minirpc_server::service::{RpcService, ServiceReply};
use minirpc_server::{LocalRegistry, TcpServer};

struct CountingEcho {
    calls: Arc<AtomicUsize>,
}

impl RpcService for CountingEcho {
    fn invoke(&self, request: &RpcRequest) -> minirpc_common::RpcResult<ServiceReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let arg = request.args.first().cloned().unwrap_or(Value::Null);
        Ok(ServiceReply::new(arg, "i64"))
    }
}

/// Starts a server with one counting echo service, returns its address and
/// the invocation counter.
async fn start_server() -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let services = Arc::new(LocalRegistry::new());
    services.register(
        "demo.Echo",
        Arc::new(CountingEcho {
            calls: calls.clone(),
        }),
    );

    let server = TcpServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = server.run(services).await;
    });
    (addr, calls)
}

fn echo_frame(marker: i64) -> (u64, Vec<u8>) {
    let request = RpcRequest::new(
        "demo.Echo",
        "echo",
        vec!["i64".to_string()],
        vec![Value::I64(marker)],
    );
    let request_id = next_request_id();
    let header = Header::request(0, request_id);
    let frame = wire::encode(&header, &MessageBody::Request(request)).unwrap();
    (request_id, frame.to_vec())
}

/// Reads exactly one frame from the stream.
async fn read_frame(stream: &mut TcpStream, decoder: &mut FrameDecoder) -> Vec<u8> {
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(frame) = decoder.next_frame().unwrap() {
            return frame.to_vec();
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed while awaiting a frame");
        decoder.extend(&chunk[..n]);
    }
}

#[tokio::test]
async fn byte_by_byte_request_gets_one_response() {
    let (addr, calls) = start_server().await;
    let mut stream = TcpStream::connect(&addr).await.unwrap();

    let (request_id, frame) = echo_frame(7);
    for byte in &frame {
        stream.write_all(&[*byte]).await.unwrap();
        stream.flush().await.unwrap();
    }

    let mut decoder = FrameDecoder::new();
    let reply = read_frame(&mut stream, &mut decoder).await;
    let message = wire::decode(&reply).unwrap();
    assert_eq!(message.header.request_id, request_id);
    match message.body {
        MessageBody::Response(response) => assert_eq!(response.data, Some(Value::I64(7))),
        other => panic!("expected a response, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hundred_coalesced_frames_get_ordered_responses() {
    let (addr, calls) = start_server().await;
    let mut stream = TcpStream::connect(&addr).await.unwrap();

    let mut request_ids = Vec::new();
    let mut burst = Vec::new();
    for marker in 0..100 {
        let (request_id, frame) = echo_frame(marker);
        request_ids.push(request_id);
        burst.extend_from_slice(&frame);
    }
    // all hundred frames in a single write
    stream.write_all(&burst).await.unwrap();

    let mut decoder = FrameDecoder::new();
    for (marker, expected_id) in request_ids.iter().enumerate() {
        let reply = read_frame(&mut stream, &mut decoder).await;
        let message = wire::decode(&reply).unwrap();
        // responses come back in arrival order, correlated by request id
        assert_eq!(message.header.request_id, *expected_id);
        match message.body {
            MessageBody::Response(response) => {
                assert_eq!(response.data, Some(Value::I64(marker as i64)));
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn bad_magic_closes_connection_without_dispatch() {
    let (addr, calls) = start_server().await;
    let mut stream = TcpStream::connect(&addr).await.unwrap();

    let (_, mut frame) = echo_frame(1);
    frame[0] = 0x02;
    stream.write_all(&frame).await.unwrap();

    // the server drops the connection instead of responding
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).await.unwrap_or(0);
    assert_eq!(n, 0, "expected the server to close the connection");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connections_are_served_concurrently() {
    let (addr, calls) = start_server().await;

    let mut handles = Vec::new();
    for marker in 0..8i64 {
        let addr = addr.clone();
        handles.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(&addr).await.unwrap();
            let (request_id, frame) = echo_frame(marker);
            stream.write_all(&frame).await.unwrap();

            let mut decoder = FrameDecoder::new();
            let reply = read_frame(&mut stream, &mut decoder).await;
            let message = wire::decode(&reply).unwrap();
            assert_eq!(message.header.request_id, request_id);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}
