//
// client.rs
//
// Copyright (c) The Move Contributors
// SPDX-License-Identifier: Apache-2.0
//
//

use lsp_client::transport;
use lsp_client::wire::Message;
use lsp_client::wire::RequestId;
use lsp_client::Client;
use lsp_client::Error;
use lsp_types::request::Request as _;
use tokio::io::BufReader;
use tokio::io::DuplexStream;
use tokio::io::ReadHalf;
use tokio::io::WriteHalf;

/// In-memory stand-in for a language server process. Tests drive one side of
/// a duplex pipe while the client under test runs against the other.
struct DummyServer {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl DummyServer {
    fn connect() -> (Client, Self) {
        // Initialize logging
        let _ = env_logger::try_init();

        let (client_side, server_side) = tokio::io::duplex(64 * 1024);

        let (client_read, client_write) = tokio::io::split(client_side);
        let client = Client::connect(client_read, client_write);

        let (server_read, server_write) = tokio::io::split(server_side);
        let server = Self {
            reader: BufReader::new(server_read),
            writer: server_write,
        };

        (client, server)
    }

    async fn recv(&mut self) -> Option<Message> {
        transport::read_message(&mut self.reader).await.unwrap()
    }

    async fn send(&mut self, message: Message) {
        transport::write_message(&mut self.writer, &message)
            .await
            .unwrap();
    }

    /// Read one message, asserting it is a request for `method`.
    async fn recv_request(&mut self, method: &str) -> lsp_client::wire::Request {
        match self.recv().await {
            Some(Message::Request(request)) => {
                assert_eq!(request.method, method);
                request
            },
            other => panic!("Expected a '{method}' request, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_request_response_roundtrip() {
    let (client, mut server) = DummyServer::connect();

    let server_task = tokio::spawn(async move {
        let request = server.recv_request(lsp_types::request::Shutdown::METHOD).await;
        server
            .send(Message::response(request.id, serde_json::Value::Null))
            .await;
        server
    });

    client
        .request::<lsp_types::request::Shutdown>(())
        .await
        .unwrap();
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_out_of_order_responses_route_by_id() {
    let (client, mut server) = DummyServer::connect();

    let server_task = tokio::spawn(async move {
        let first = server.recv_request("textDocument/inlayHint").await;
        let second = server.recv_request("textDocument/inlayHint").await;

        // Answer in reverse order
        server
            .send(Message::response(second.id, serde_json::json!([])))
            .await;
        server
            .send(Message::response(
                first.id,
                serde_json::json!([{
                    "position": { "line": 0, "character": 4 },
                    "label": "u64",
                }]),
            ))
            .await;
    });

    let params = |line: u32| lsp_types::InlayHintParams {
        work_done_progress_params: Default::default(),
        text_document: lsp_types::TextDocumentIdentifier {
            uri: lsp_types::Url::parse("file:///tmp/example.move").unwrap(),
        },
        range: lsp_types::Range::new(
            lsp_types::Position::new(line, 0),
            lsp_types::Position::new(line + 1, 0),
        ),
    };

    let first = client.request::<lsp_types::request::InlayHintRequest>(params(0));
    let second = client.request::<lsp_types::request::InlayHintRequest>(params(10));
    let (first, second) = tokio::join!(first, second);

    let first = first.unwrap().unwrap();
    assert_eq!(first.len(), 1);
    // `InlayHintLabel` does not implement `PartialEq`, so compare via `matches!`
    assert!(matches!(
        &first[0].label,
        lsp_types::InlayHintLabel::String(label) if label == "u64"
    ));
    assert_eq!(second.unwrap().unwrap().len(), 0);

    server_task.await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let (client, mut server) = DummyServer::connect();

    let server_task = tokio::spawn(async move {
        let request = server.recv_request(lsp_types::request::Shutdown::METHOD).await;
        server
            .send(Message::error_response(request.id, -32000, "not ready"))
            .await;
    });

    let err = client
        .request::<lsp_types::request::Shutdown>(())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Server { code: -32000, ref message } if message == "not ready"));

    server_task.await.unwrap();
}

#[tokio::test]
async fn test_initialize_handshake() {
    let (client, mut server) = DummyServer::connect();

    let server_task = tokio::spawn(async move {
        let request = server.recv_request(lsp_types::request::Initialize::METHOD).await;
        server
            .send(Message::response(
                request.id,
                serde_json::json!({ "capabilities": {} }),
            ))
            .await;

        // The handshake must finish with the `initialized` notification
        match server.recv().await {
            Some(Message::Notification(notification)) => {
                assert_eq!(notification.method, "initialized");
            },
            other => panic!("Expected 'initialized', got {other:?}"),
        }
    });

    client
        .initialize(lsp_types::InitializeParams::default())
        .await
        .unwrap();
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_disconnect_fails_pending_requests() {
    let (client, mut server) = DummyServer::connect();

    let server_task = tokio::spawn(async move {
        let _request = server.recv_request(lsp_types::request::Shutdown::METHOD).await;
        // Drop the server without answering
    });

    let err = client
        .request::<lsp_types::request::Shutdown>(())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Disconnected));
    server_task.await.unwrap();

    // Later requests fail fast
    let err = client
        .request::<lsp_types::request::Shutdown>(())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Disconnected));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_requests_racing_a_disconnect_always_resolve() {
    let (client, server) = DummyServer::connect();

    // Drop the transport and immediately fire requests, so some of them
    // overlap the reader task noticing the EOF and failing the pending set.
    // Every one of them must resolve with an error rather than wait forever.
    drop(server);

    for _ in 0..100 {
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.request::<lsp_types::request::Shutdown>(()),
        )
        .await
        .expect("request left waiting after the transport was closed");
        assert!(matches!(result, Err(Error::Disconnected)));
    }
}

#[tokio::test]
async fn test_server_initiated_request_is_rejected() {
    let (client, mut server) = DummyServer::connect();

    server
        .send(Message::request(
            RequestId::Number(99),
            "workspace/configuration",
            None,
        ))
        .await;

    match server.recv().await {
        Some(Message::Response(response)) => {
            assert_eq!(response.id, RequestId::Number(99));
            let error = response.error.expect("expected an error response");
            assert_eq!(error.code, lsp_client::wire::METHOD_NOT_FOUND);
        },
        other => panic!("Expected an error response, got {other:?}"),
    }

    // The connection survives: a normal request still works
    let server_task = tokio::spawn(async move {
        let request = server.recv_request(lsp_types::request::Shutdown::METHOD).await;
        server
            .send(Message::response(request.id, serde_json::Value::Null))
            .await;
    });

    client
        .request::<lsp_types::request::Shutdown>(())
        .await
        .unwrap();
    server_task.await.unwrap();

    drop(client);
}
