//! TCP server: accepts connections, reassembles frames, dispatches requests.

use bytes::Bytes;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use minirpc_common::error::{RpcError, RpcResult};
use minirpc_common::protocol::{RpcException, RpcRequest, RpcResponse};
use minirpc_common::wire::{self, FrameDecoder, Header, MessageBody};

use crate::local_registry::LocalRegistry;

/// Async TCP server for the provider side.
///
/// Each accepted connection gets its own task and its own [`FrameDecoder`];
/// frames on one connection are handled strictly in arrival order while
/// connections proceed concurrently.
pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    /// Binds to `addr`, e.g. `"localhost:8121"`. Port 0 binds an ephemeral
    /// port, queryable through [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str) -> RpcResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| RpcError::Connection(format!("failed to bind to {addr}: {err}")))?;
        Ok(TcpServer { listener })
    }

    pub fn local_addr(&self) -> RpcResult<std::net::SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|err| RpcError::Connection(format!("failed to get local addr: {err}")))
    }

    /// Accept loop. Runs until the listener fails.
    pub async fn run(self, services: Arc<LocalRegistry>) -> RpcResult<()> {
        loop {
            let (stream, peer_addr) = self.listener.accept().await.map_err(|err| {
                RpcError::Connection(format!("failed to accept connection: {err}"))
            })?;
            debug!(%peer_addr, "connection established");

            let services = services.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, services).await {
                    // protocol violations and io failures land here; the
                    // connection is already gone either way
                    warn!(%peer_addr, %err, "connection closed");
                }
            });
        }
    }
}

async fn handle_connection(mut stream: TcpStream, services: Arc<LocalRegistry>) -> RpcResult<()> {
    let mut decoder = FrameDecoder::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            debug!("connection closed by peer");
            return Ok(());
        }
        decoder.extend(&chunk[..n]);

        while let Some(frame) = decoder.next_frame()? {
            let reply = handle_frame(&frame, &services)?;
            stream.write_all(&reply).await?;
        }
    }
}

/// Decodes one frame, dispatches it and encodes the reply.
///
/// Protocol errors propagate and close the connection without any dispatch;
/// dispatch failures are encoded into the response body instead.
fn handle_frame(frame: &[u8], services: &LocalRegistry) -> RpcResult<Bytes> {
    let message = wire::decode(frame)?;
    let request = match message.body {
        MessageBody::Request(request) => request,
        MessageBody::Response(_) => {
            return Err(RpcError::Protocol(
                "unexpected response frame on server".to_string(),
            ))
        }
    };

    let response = dispatch(services, &request);
    let header = Header::response_to(&message.header);
    wire::encode(&header, &MessageBody::Response(response))
}

fn dispatch(services: &LocalRegistry, request: &RpcRequest) -> RpcResponse {
    let Some(service) = services.get(&request.service_name) else {
        warn!(
            service = %request.service_name,
            method = %request.method_name,
            "no local registration for service"
        );
        return RpcResponse::failure(RpcException::new(
            "DispatchError",
            format!("no local service named {}", request.service_name),
        ));
    };

    match service.invoke(request) {
        Ok(reply) => RpcResponse::ok(reply.data, reply.data_type),
        Err(err) => {
            warn!(
                service = %request.service_name,
                method = %request.method_name,
                %err,
                "invocation failed"
            );
            RpcResponse::failure(RpcException::new(error_kind(&err), err.to_string()))
        }
    }
}

fn error_kind(err: &RpcError) -> &'static str {
    match err {
        RpcError::Dispatch(_) => "DispatchError",
        RpcError::Serialization(_) => "SerializationError",
        _ => "InternalError",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{RpcService, ServiceReply};
    use minirpc_common::protocol::{next_request_id, Value};

    struct Doubler;
    impl RpcService for Doubler {
        fn invoke(&self, request: &RpcRequest) -> RpcResult<ServiceReply> {
            match request.method_name.as_str() {
                "double" => match request.args.first() {
                    Some(Value::I64(n)) => Ok(ServiceReply::new(Value::I64(n * 2), "i64")),
                    _ => Err(RpcError::Dispatch("double takes one i64".to_string())),
                },
                other => Err(RpcError::Dispatch(format!("no such method: {other}"))),
            }
        }
    }

    fn registry_with_doubler() -> LocalRegistry {
        let registry = LocalRegistry::new();
        registry.register("demo.Doubler", Arc::new(Doubler));
        registry
    }

    fn request_frame(service: &str, method: &str, arg: i64) -> Bytes {
        let request = RpcRequest::new(
            service,
            method,
            vec!["i64".to_string()],
            vec![Value::I64(arg)],
        );
        let header = Header::request(0, next_request_id());
        wire::encode(&header, &MessageBody::Request(request)).unwrap()
    }

    #[test]
    fn test_frame_dispatch_success() {
        let services = registry_with_doubler();
        let frame = request_frame("demo.Doubler", "double", 21);

        let reply = handle_frame(&frame, &services).unwrap();
        let message = wire::decode(&reply).unwrap();
        match message.body {
            MessageBody::Response(response) => {
                assert!(response.is_ok());
                assert_eq!(response.data, Some(Value::I64(42)));
                assert_eq!(response.data_type.as_deref(), Some("i64"));
                assert_eq!(response.message, "ok");
            }
            other => panic!("expected a response body, got {other:?}"),
        }
    }

    #[test]
    fn test_response_header_copies_request_header() {
        let services = registry_with_doubler();
        let frame = request_frame("demo.Doubler", "double", 1);
        let request_header = wire::decode(&frame).unwrap().header;

        let reply = handle_frame(&frame, &services).unwrap();
        let header = wire::decode(&reply).unwrap().header;
        assert_eq!(header.request_id, request_header.request_id);
        assert_eq!(header.serializer, request_header.serializer);
        assert_eq!(header.message_type, 1);
        assert_eq!(header.status, 0);
    }

    #[test]
    fn test_unknown_service_yields_exception_response() {
        let services = registry_with_doubler();
        let frame = request_frame("demo.Missing", "double", 1);

        let reply = handle_frame(&frame, &services).unwrap();
        match wire::decode(&reply).unwrap().body {
            MessageBody::Response(response) => {
                assert!(!response.is_ok());
                let exception = response.exception.unwrap();
                assert_eq!(exception.kind, "DispatchError");
                assert!(exception.message.contains("demo.Missing"));
            }
            other => panic!("expected a response body, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method_yields_exception_response() {
        let services = registry_with_doubler();
        let frame = request_frame("demo.Doubler", "triple", 1);

        let reply = handle_frame(&frame, &services).unwrap();
        match wire::decode(&reply).unwrap().body {
            MessageBody::Response(response) => {
                assert!(!response.is_ok());
                assert!(response.message.contains("triple"));
            }
            other => panic!("expected a response body, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_magic_is_a_protocol_error() {
        let services = registry_with_doubler();
        let mut frame = request_frame("demo.Doubler", "double", 1).to_vec();
        frame[0] = 0x02;
        assert!(matches!(
            handle_frame(&frame, &services),
            Err(RpcError::Protocol(_))
        ));
    }
}
