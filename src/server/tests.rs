//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::collections::VecDeque;
    use std::io;
    use std::net::SocketAddr;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use serde_json::{Value, json};
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::net::{TcpListener, TcpStream};

    use crate::parser::Method;
    use crate::server::{CorsPolicy, Error, FieldError, HttpResponse, HttpServer, ServerConfig, StatusCode};

    // In-memory stand-in for a TcpStream. Each queued chunk is handed out by
    // a separate read, so requests can arrive in pieces. A stalled stream
    // never reports EOF once its chunks run out.
    struct MockTcpStream {
        chunks: VecDeque<Vec<u8>>,
        write_data: Vec<u8>,
        stalled: bool,
    }

    impl MockTcpStream {
        fn new(read_data: impl Into<Vec<u8>>) -> Self {
            Self::chunked(vec![read_data.into()])
        }

        fn chunked(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
                write_data: Vec::new(),
                stalled: false,
            }
        }

        fn stalled(read_data: impl Into<Vec<u8>>) -> Self {
            let read_data = read_data.into();
            let chunks = if read_data.is_empty() { Vec::new() } else { vec![read_data] };
            Self {
                stalled: true,
                ..Self::chunked(chunks)
            }
        }

        fn written(&self) -> String {
            String::from_utf8_lossy(&self.write_data).into_owned()
        }

        fn written_json(&self) -> Value {
            let written = self.written();
            let (_, body) = written.split_once("\r\n\r\n").expect("response has a body separator");
            serde_json::from_str(body).expect("response body is JSON")
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if let Some(mut chunk) = this.chunks.pop_front() {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    this.chunks.push_front(chunk.split_off(n));
                }
            } else if this.stalled {
                return Poll::Pending;
            }
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn server_with_routes() -> HttpServer {
        let server = HttpServer::new(ServerConfig::default());

        server.add_route("/ping", vec![Method::GET], |_req| async {
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string("pong"))
        }).await;

        server.add_route("/echo", vec![Method::POST], |req| async move {
            Ok(HttpResponse::new(StatusCode::Created)
                .with_content_type("text/plain")
                .with_body_bytes(req.body))
        }).await;

        server.add_route("/echo", vec![Method::PUT], |_req| async {
            Ok(HttpResponse::new(StatusCode::NoContent))
        }).await;

        server.add_route("/invalid", vec![Method::GET], |_req| async {
            Err(Error::invalid(&["query", "q"], "Field required", "missing"))
        }).await;

        server.add_route("/broken", vec![Method::GET], |_req| async {
            Err(Error::InternalError("store unavailable".to_string()))
        }).await;

        server
    }

    async fn send(server: &HttpServer, stream: &mut MockTcpStream) -> Result<(), Error> {
        HttpServer::handle_connection(stream, server.routes.clone(), &server.config).await
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 1024);
        assert_eq!(config.read_buffer_size, 8192);
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.cors, CorsPolicy::default());
    }

    #[tokio::test]
    async fn test_add_route() {
        let server = server_with_routes().await;

        let routes = server.routes.read().await;
        assert_eq!(routes.len(), 5);
        assert_eq!(routes[0].path, "/ping");
        assert_eq!(routes[0].methods, vec![Method::GET]);
        assert!(routes[1].matches_path("/echo"));
        assert!(routes[1].allows(Method::POST));
        assert!(!routes[1].allows(Method::GET));
    }

    #[tokio::test]
    async fn test_handle_connection_with_valid_request() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        assert!(send(&server, &mut stream).await.is_ok());

        let response = stream.written();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.contains("Content-Length: 4\r\n"));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.ends_with("\r\n\r\npong"));
    }

    #[tokio::test]
    async fn test_query_string_does_not_affect_routing() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /ping?verbose=1 HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        assert!(send(&server, &mut stream).await.is_ok());
        assert!(stream.written().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_not_found() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /nonexistent HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::NotFound(ref path)) if path == "/nonexistent"));

        assert!(stream.written().starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert_eq!(stream.written_json(), json!({ "detail": "Not found: /nonexistent" }));
    }

    #[tokio::test]
    async fn test_handle_connection_with_method_not_allowed() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"DELETE /echo HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        let result = send(&server, &mut stream).await;
        match result {
            Err(Error::MethodNotAllowed { method, path, allowed }) => {
                assert_eq!(method, Method::DELETE);
                assert_eq!(path, "/echo");
                assert_eq!(allowed, vec![Method::POST, Method::PUT]);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }

        let response = stream.written();
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.contains("Allow: POST, PUT\r\n"));
    }

    #[tokio::test]
    async fn test_routes_sharing_a_path() {
        let server = server_with_routes().await;

        let mut post = MockTcpStream::new(b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello".to_vec());
        assert!(send(&server, &mut post).await.is_ok());
        assert!(post.written().starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(post.written().ends_with("hello"));

        let mut put = MockTcpStream::new(b"PUT /echo HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());
        assert!(send(&server, &mut put).await.is_ok());
        assert!(put.written().starts_with("HTTP/1.1 204 No Content\r\n"));
    }

    #[tokio::test]
    async fn test_body_arriving_in_pieces() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::chunked(vec![
            b"POST /echo HTTP/1.1\r\nHost: local".to_vec(),
            b"host\r\nContent-Length: 11\r\n\r\nhello".to_vec(),
            b" world".to_vec(),
        ]);

        assert!(send(&server, &mut stream).await.is_ok());
        assert!(stream.written().ends_with("\r\n\r\nhello world"));
    }

    #[tokio::test]
    async fn test_truncated_body_is_a_bad_request() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nhello".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(stream.written().starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_request() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"INVALID REQUEST".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::ParseError(_))));

        assert!(stream.written().starts_with("HTTP/1.1 400 Bad Request\r\n"));
        let detail = stream.written_json()["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Parse error:"));
    }

    #[tokio::test]
    async fn test_closed_without_data() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(Vec::new());

        assert!(send(&server, &mut stream).await.is_ok());
        assert!(stream.written().is_empty());
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let mut server = server_with_routes().await;
        server.config.max_body_size = 4;
        let mut stream = MockTcpStream::new(b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::PayloadTooLarge { limit: 4 })));
        assert!(stream.written().starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn test_head_over_limit() {
        let mut server = server_with_routes().await;
        server.config.read_buffer_size = 32;
        let mut stream = MockTcpStream::new(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nX-Padding: aaaaaaaaaaaaaaaa\r\n\r\n".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::HeaderTooLarge { limit: 32 })));
        assert!(stream.written().starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
    }

    #[tokio::test]
    async fn test_validation_error_from_handler() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /invalid HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::Validation(_))));

        assert!(stream.written().starts_with("HTTP/1.1 422 Unprocessable Entity\r\n"));
        assert!(stream.written().contains("Content-Type: application/json\r\n"));
        assert_eq!(
            stream.written_json(),
            json!({ "detail": [{ "loc": ["query", "q"], "msg": "Field required", "type": "missing" }] })
        );
    }

    #[tokio::test]
    async fn test_internal_error_from_handler() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /broken HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::InternalError(_))));
        assert!(stream.written().starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert_eq!(stream.written_json(), json!({ "detail": "Internal server error: store unavailable" }));
    }

    #[tokio::test]
    async fn test_cors_headers_echo_origin() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nOrigin: http://app.example\r\n\r\n".to_vec());

        assert!(send(&server, &mut stream).await.is_ok());
        let response = stream.written();
        assert!(response.contains("Access-Control-Allow-Origin: http://app.example\r\n"));
        assert!(response.contains("Access-Control-Allow-Credentials: true\r\n"));
        assert!(response.contains("Vary: Origin\r\n"));
    }

    #[tokio::test]
    async fn test_cors_headers_on_error_responses() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /missing HTTP/1.1\r\nHost: localhost\r\nOrigin: http://app.example\r\n\r\n".to_vec());

        assert!(send(&server, &mut stream).await.is_err());
        assert!(stream.written().contains("Access-Control-Allow-Origin: http://app.example\r\n"));
    }

    #[tokio::test]
    async fn test_cors_headers_on_rejected_requests() {
        let mut server = server_with_routes().await;
        server.config.max_body_size = 4;
        let mut stream = MockTcpStream::new(
            b"POST /echo HTTP/1.1\r\nHost: localhost\r\nOrigin: http://app.example\r\nContent-Length: 5\r\n\r\nhello".to_vec(),
        );
        assert!(matches!(send(&server, &mut stream).await, Err(Error::PayloadTooLarge { .. })));
        assert!(stream.written().starts_with("HTTP/1.1 413 "));
        assert!(stream.written().contains("Access-Control-Allow-Origin: http://app.example\r\n"));

        server.config.read_buffer_size = 64;
        let mut request = b"GET /ping HTTP/1.1\r\nOrigin: http://app.example\r\nX-Padding: ".to_vec();
        request.extend_from_slice(&[b'a'; 64]);
        let mut stream = MockTcpStream::new(request);
        assert!(matches!(send(&server, &mut stream).await, Err(Error::HeaderTooLarge { .. })));
        assert!(stream.written().starts_with("HTTP/1.1 431 "));
        assert!(stream.written().contains("Access-Control-Allow-Origin: http://app.example\r\n"));

        let mut stream = MockTcpStream::new(b"GET /ping HTTP/1.1\r\nOrigin: http://app.example\r\n\r\n".to_vec());
        assert!(matches!(send(&server, &mut stream).await, Err(Error::ParseError(_))));
        assert!(stream.written().starts_with("HTTP/1.1 400 "));
        assert!(stream.written().contains("Access-Control-Allow-Origin: http://app.example\r\n"));
        assert!(stream.written().contains("Access-Control-Allow-Credentials: true\r\n"));
    }

    #[tokio::test]
    async fn test_stalled_request_times_out() {
        let mut server = server_with_routes().await;
        server.config.read_timeout = Duration::from_millis(50);

        let mut stream = MockTcpStream::stalled(
            b"POST /echo HTTP/1.1\r\nHost: localhost\r\nOrigin: http://app.example\r\nContent-Length: 11\r\n\r\nhello".to_vec(),
        );
        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::RequestTimeout { after }) if after == Duration::from_millis(50)));
        assert!(stream.written().starts_with("HTTP/1.1 408 Request Timeout\r\n"));
        assert!(stream.written().contains("Access-Control-Allow-Origin: http://app.example\r\n"));

        // Nothing sent at all
        let mut stream = MockTcpStream::stalled(Vec::new());
        assert!(matches!(send(&server, &mut stream).await, Err(Error::RequestTimeout { .. })));
        assert!(stream.written().starts_with("HTTP/1.1 408 Request Timeout\r\n"));
    }

    #[tokio::test]
    async fn test_no_cors_headers_without_origin() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        assert!(send(&server, &mut stream).await.is_ok());
        assert!(!stream.written().contains("Access-Control-Allow-Origin"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(
            b"OPTIONS /echo HTTP/1.1\r\nHost: localhost\r\nOrigin: http://app.example\r\nAccess-Control-Request-Method: POST\r\nAccess-Control-Request-Headers: content-type, x-trace\r\n\r\n".to_vec(),
        );

        assert!(send(&server, &mut stream).await.is_ok());
        let response = stream.written();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Access-Control-Allow-Origin: http://app.example\r\n"));
        assert!(response.contains("Access-Control-Allow-Methods: DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT\r\n"));
        assert!(response.contains("Access-Control-Allow-Headers: content-type, x-trace\r\n"));
        assert!(response.contains("Access-Control-Max-Age: 600\r\n"));
        assert!(response.ends_with("\r\n\r\nOK"));
    }

    #[tokio::test]
    async fn test_plain_options_is_routed() {
        let server = server_with_routes().await;
        let mut stream = MockTcpStream::new(b"OPTIONS /ping HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());

        let result = send(&server, &mut stream).await;
        assert!(matches!(result, Err(Error::MethodNotAllowed { .. })));
    }

    #[test]
    fn test_cors_without_credentials_uses_wildcard() {
        let policy = CorsPolicy { allow_credentials: false, max_age: 60 };
        let response = policy.apply(Some("http://app.example"), HttpResponse::new(StatusCode::Ok));
        assert_eq!(response.get_header("access-control-allow-origin").unwrap(), "*");
        assert!(response.get_header("Access-Control-Allow-Credentials").is_none());
    }

    #[test]
    fn test_response_serialization() {
        let response = HttpResponse::new(StatusCode::Created)
            .with_json(&json!({ "ok": true }))
            .unwrap();
        let bytes = String::from_utf8(response.to_bytes()).unwrap();

        assert!(bytes.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(bytes.contains("Server: httpserver-rust\r\n"));
        assert!(bytes.contains("Content-Length: 11\r\n"));
        assert!(bytes.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(Error::NotFound("/x".to_string()).status(), StatusCode::NotFound);
        assert_eq!(Error::Validation(Vec::new()).status(), StatusCode::UnprocessableEntity);
        assert_eq!(Error::PayloadTooLarge { limit: 1 }.status(), StatusCode::PayloadTooLarge);
        assert_eq!(Error::RequestTimeout { after: Duration::from_secs(1) }.status(), StatusCode::RequestTimeout);
        assert_eq!(StatusCode::RequestTimeout.reason_phrase(), "Request Timeout");
        assert_eq!(Error::InternalError("x".to_string()).status(), StatusCode::InternalServerError);
        assert!(StatusCode::UnprocessableEntity.is_client_error());
        assert!(!StatusCode::InternalServerError.is_client_error());
    }

    #[test]
    fn test_validation_error_message_lists_fields() {
        let error = Error::Validation(vec![
            FieldError::new(&["body", "name"], "Field required", "missing"),
            FieldError::new(&["body", "price"], "Input should be greater than 0", "greater_than"),
        ]);
        assert_eq!(
            error.to_string(),
            "Validation failed: body.name: Field required; body.price: Input should be greater than 0"
        );
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let server = server_with_routes().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        for _ in 0..2 {
            let mut client = TcpStream::connect(addr).await.unwrap();
            client.write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();

            let mut response = String::new();
            client.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
            assert!(response.ends_with("pong"));
        }
    }
}
