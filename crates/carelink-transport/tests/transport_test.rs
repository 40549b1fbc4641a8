//! Integration tests for both transports against a mock server

use assert_matches::assert_matches;
use carelink_transport::socket::{Security, Target};
use carelink_transport::{
    Error, ErrorKind, FilePart, MultipartBody, SocketTransport, Transport, TransportKind,
    TransportRequest, TransportSettings, build_transport,
};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(kind: TransportKind) -> Arc<dyn Transport> {
    build_transport(kind, &TransportSettings::default()).expect("Failed to build transport")
}

fn request(server: &MockServer, method: http::Method, path: &str) -> TransportRequest {
    TransportRequest::new(
        method,
        server.uri().parse().unwrap(),
        path,
        Duration::from_secs(5),
    )
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_get_with_query_and_headers(#[case] kind: TransportKind) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/members"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer sk_test"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req_123")
                .set_body_json(json!({"object": "list", "data": []})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut req = request(&mock_server, http::Method::GET, "/v1/members");
    req.query = vec![("limit".to_string(), "5".to_string())];
    req.headers
        .insert("authorization", "Bearer sk_test".parse().unwrap());

    let response = transport(kind).request(req).await.expect("Request failed");

    assert_eq!(response.status, 200);
    assert_eq!(response.headers["x-request-id"], "req_123");
    assert_eq!(response.data, json!({"object": "list", "data": []}));
    mock_server.verify().await;
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_post_json_body(#[case] kind: TransportKind) {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/members"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"email": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "mem_1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut req = request(&mock_server, http::Method::POST, "/v1/members");
    req.body = Some(json!({"email": "ada@example.com"}).into());

    let response = transport(kind).request(req).await.unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.data["id"], "mem_1");
}

#[rstest]
#[case(TransportKind::Fetch, 200)]
#[case(TransportKind::Fetch, 422)]
#[case(TransportKind::Socket, 200)]
#[case(TransportKind::Socket, 500)]
#[tokio::test]
async fn test_error_envelope_independent_of_status(
    #[case] kind: TransportKind,
    #[case] status: u16,
) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/members/mem_1"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "object": "error",
            "type": "invalid_request",
            "code": "x",
            "message": "y"
        })))
        .mount(&mock_server)
        .await;

    let error = transport(kind)
        .request(request(&mock_server, http::Method::GET, "/v1/members/mem_1"))
        .await
        .unwrap_err();

    assert_matches!(
        error,
        Error::Api { status: s, ref error_type, ref code, ref message }
            if s == status && error_type == "invalid_request" && code == "x" && message == "y"
    );
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_unparseable_body(#[case] kind: TransportKind) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let error = transport(kind)
        .request(request(&mock_server, http::Method::GET, "/v1/members"))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InvalidResponse);
    assert_eq!(error.status(), Some(200));
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_timeout_before_response(#[case] kind: TransportKind) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let mut req = request(&mock_server, http::Method::GET, "/v1/members");
    req.timeout = Duration::from_millis(100);

    let error = transport(kind).request(req).await.unwrap_err();
    assert_matches!(
        error,
        Error::RequestTimeout { timeout } if timeout == Duration::from_millis(100)
    );
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_refused_connection(#[case] kind: TransportKind) {
    // Bind and immediately drop a listener to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let req = TransportRequest::new(
        http::Method::GET,
        format!("http://127.0.0.1:{port}").parse().unwrap(),
        "/v1/members",
        Duration::from_secs(5),
    );

    let error = transport(kind).request(req).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ConnectionFailed);
}

#[tokio::test]
async fn test_socket_pool_reuses_connection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let transport = SocketTransport::new().unwrap();
    let address = mock_server.address();
    let target = Target {
        host: address.ip().to_string(),
        port: address.port(),
    };
    let pool = transport.pool(Security::Plain);
    assert_eq!(pool.idle_count(&target).await, 0);

    for _ in 0..2 {
        transport
            .request(request(&mock_server, http::Method::GET, "/v1/ping"))
            .await
            .unwrap();
        assert_eq!(pool.idle_count(&target).await, 1);
    }
    assert_eq!(transport.pool(Security::Tls).idle_count(&target).await, 0);
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_tls_handshake_against_plain_server(#[case] kind: TransportKind) {
    let mock_server = MockServer::start().await;
    let address = mock_server.address();

    let req = TransportRequest::new(
        http::Method::GET,
        format!("https://{address}").parse().unwrap(),
        "/v1/members",
        Duration::from_secs(5),
    );

    let error = transport(kind).request(req).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ConnectionFailed);
}

#[tokio::test]
async fn test_socket_pool_drops_closed_connection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("connection", "close")
                .set_body_json(json!({"ok": true})),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let transport = SocketTransport::new().unwrap();
    let address = mock_server.address();
    let target = Target {
        host: address.ip().to_string(),
        port: address.port(),
    };
    let pool = transport.pool(Security::Plain);

    for _ in 0..2 {
        let response = transport
            .request(request(&mock_server, http::Method::GET, "/v1/ping"))
            .await
            .unwrap();
        assert_eq!(response.data, json!({"ok": true}));
        assert_eq!(pool.idle_count(&target).await, 0);
    }
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_multipart_upload(#[case] kind: TransportKind) {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/documents"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"metadata[kind]\""))
        .and(body_string_contains("filename=\"notes.txt\""))
        .and(body_string_contains("streamed contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "doc_1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let chunks = futures::stream::iter(vec![
        Ok(bytes::Bytes::from_static(b"streamed ")),
        Ok(bytes::Bytes::from_static(b"contents")),
    ]);
    let body = MultipartBody::new()
        .field("metadata", json!({"kind": "note"}))
        .file("file", FilePart::stream("notes.txt", chunks).mime("text/plain"));

    let mut req = request(&mock_server, http::Method::POST, "/v1/documents");
    req.body = Some(body.into());

    let response = transport(kind).request(req).await.unwrap();
    assert_eq!(response.data["id"], "doc_1");
}

#[rstest]
#[case(TransportKind::Fetch)]
#[case(TransportKind::Socket)]
#[tokio::test]
async fn test_empty_body_decodes_to_null(#[case] kind: TransportKind) {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let response = transport(kind)
        .request(request(&mock_server, http::Method::DELETE, "/v1/members/mem_1"))
        .await
        .unwrap();

    assert_eq!(response.status, 204);
    assert!(response.data.is_null());
}
