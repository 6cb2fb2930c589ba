use std::net::SocketAddr;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use triprotocol_core::operation::{
    AuthRequest, AuthResponse, EchoRequest, EchoResponse, LogoutRequest, LogoutResponse,
    StatusRequest, StatusResponse, SumRequest, SumResponse,
};
use triprotocol_core::{LocalTime, RequestEnvelope, ResponseEnvelope, ServiceError, Status};
use triprotocol_fabric::codec::{AnyCodec, BinaryCodec, Codec, Framing, Protocol, MAX_FRAME_SIZE};
use triprotocol_fabric::request::request_tcp;
use triprotocol_fabric::transport::tcp::read_frame;
use triprotocol_fabric::{AppLayerClient, Error, TcpTransport, Transport};

fn at(h: u32, mi: u32, s: u32, micros: u32) -> LocalTime {
    let naive = NaiveDate::from_ymd_opt(2025, 10, 30)
        .and_then(|date| date.and_hms_micro_opt(h, mi, s, micros))
        .unwrap();
    LocalTime::new(naive.and_utc())
}

/// Helper to get a free port
async fn get_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Accepts one connection and reads one framed request from it
async fn accept_request(listener: &TcpListener, framing: Framing) -> (TcpStream, Vec<u8>) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let bytes = read_frame(&mut stream, framing, MAX_FRAME_SIZE).await.unwrap();
    (stream, bytes)
}

async fn reply(mut stream: TcpStream, bytes: Vec<u8>) {
    stream.write_all(&bytes).await.unwrap();
    stream.flush().await.unwrap();
}

fn auth_response() -> AuthResponse {
    AuthResponse {
        token: "tokenauth".into(),
        name: "SAID CAVALCANTE RODRIGUES".into(),
        enrollment: "538349".into(),
        timestamp: at(18, 16, 4, 585339),
    }
}

fn logout_response() -> LogoutResponse {
    LogoutResponse {
        message: "Logout realizado com sucesso".into(),
        timestamp: at(21, 32, 25, 38812),
    }
}

fn echo_response(message: &str) -> EchoResponse {
    EchoResponse {
        original_message: message.into(),
        echo_message: format!("ECO: {message}"),
        server_timestamp: at(21, 12, 41, 305529),
        message_size: message.len() as i64,
        md5: "929a27e9c93c793fb599ab483f3f720d".into(),
        timestamp: at(21, 12, 41, 304798),
    }
}

/// Serves Auth, then the given operation reply, then Logout; returns the
/// logout token it saw.
fn spawn_session_server(
    listener: TcpListener,
    codec: AnyCodec,
    operation_reply: ResponseEnvelope<EchoResponse>,
) -> tokio::task::JoinHandle<Option<String>> {
    tokio::spawn(async move {
        let framing = codec.framing();

        let (stream, bytes) = accept_request(&listener, framing).await;
        let auth: RequestEnvelope<AuthRequest> = codec.decode_request(&bytes).unwrap();
        assert_eq!(auth.body.student_id, "538349");
        assert_eq!(auth.token, None);
        let out = codec
            .encode_response(&ResponseEnvelope::success(auth_response()))
            .unwrap();
        reply(stream, out).await;

        let (stream, bytes) = accept_request(&listener, framing).await;
        let echo: RequestEnvelope<EchoRequest> = codec.decode_request(&bytes).unwrap();
        assert_eq!(echo.token(), Some("tokenauth"));
        assert_eq!(echo.body.message, "Hello, world!");
        reply(stream, codec.encode_response(&operation_reply).unwrap()).await;

        let (stream, bytes) = accept_request(&listener, framing).await;
        let logout: RequestEnvelope<LogoutRequest> = codec.decode_request(&bytes).unwrap();
        let out = codec
            .encode_response(&ResponseEnvelope::success(logout_response()))
            .unwrap();
        reply(stream, out).await;
        logout.token
    })
}

#[tokio::test]
async fn full_session_over_every_protocol() {
    for protocol in Protocol::ALL {
        let (listener, addr) = get_listener().await;
        let expected = echo_response("Hello, world!");
        let server = spawn_session_server(
            listener,
            protocol.codec(),
            ResponseEnvelope::success(expected.clone()),
        );

        let client = AppLayerClient::tcp(protocol.codec());
        let echo: EchoResponse = client
            .session(&addr.to_string(), "538349", &EchoRequest::new("Hello, world!"))
            .await
            .unwrap();

        assert_eq!(echo, expected, "protocol {protocol}");
        assert_eq!(server.await.unwrap().as_deref(), Some("tokenauth"));
    }
}

#[tokio::test]
async fn session_logs_out_after_a_rejected_operation() {
    let (listener, addr) = get_listener().await;
    let codec = Protocol::String.codec();
    let server = spawn_session_server(
        listener,
        codec,
        ResponseEnvelope::failure(ServiceError::new(Status::ClientError, "Token inválido")),
    );

    let client = AppLayerClient::tcp(codec);
    let result: Result<EchoResponse, _> = client
        .session(&addr.to_string(), "538349", &EchoRequest::new("Hello, world!"))
        .await;

    match result {
        Err(Error::Service(err)) => {
            assert_eq!(err.status, Status::ClientError);
            assert_eq!(err.message, "Token inválido");
        }
        other => panic!("Expected a service error, got {other:?}"),
    }
    // The server only finishes once the logout arrived.
    assert_eq!(server.await.unwrap().as_deref(), Some("tokenauth"));
}

#[tokio::test]
async fn individual_calls_share_the_token() {
    let (listener, addr) = get_listener().await;
    let codec = Protocol::Binary.codec();
    let server = tokio::spawn(async move {
        let (stream, bytes) = accept_request(&listener, codec.framing()).await;
        let sum: RequestEnvelope<SumRequest> = codec.decode_request(&bytes).unwrap();
        assert_eq!(sum.token(), Some("abc"));
        assert_eq!(sum.body.numbers, vec![1, 2, 3]);
        let out = codec
            .encode_response(&ResponseEnvelope::success(SumResponse {
                original_numbers: vec![1.0, 2.0, 3.0],
                sum: 6.0,
                mean: 2.0,
                maximum: 3.0,
                minimum: 1.0,
                count: 3,
                calculated_at: at(16, 4, 20, 876219),
                timestamp: at(16, 4, 20, 875755),
            }))
            .unwrap();
        reply(stream, out).await;
    });

    let client = AppLayerClient::tcp(codec);
    let mut sum = SumResponse::default();
    client
        .perform_into(&addr.to_string(), &SumRequest::new(vec![1, 2, 3]), &mut sum, "abc")
        .await
        .unwrap();
    server.await.unwrap();

    assert_eq!(sum.sum, 6.0);
    assert_eq!(sum.count, 3);
    assert_eq!(sum.calculated_at, at(16, 4, 20, 876219));
}

#[tokio::test]
async fn validation_fails_before_connecting() {
    let client = AppLayerClient::tcp(Protocol::Json.codec());
    let result: Result<SumResponse, _> = client
        .perform("127.0.0.1:1", &SumRequest::new(vec![]), "t")
        .await;
    assert!(matches!(
        result,
        Err(Error::Model(triprotocol_core::Error::Validation(_)))
    ));
}

#[tokio::test]
async fn one_off_request_returns_the_error_payload() {
    let (listener, addr) = get_listener().await;
    tokio::spawn(async move {
        let (stream, bytes) = accept_request(&listener, Framing::LengthPrefixed).await;
        let status: RequestEnvelope<StatusRequest> = BinaryCodec.decode_request(&bytes).unwrap();
        assert!(status.body.detailed);
        let out = BinaryCodec
            .encode_response(&ResponseEnvelope::<StatusResponse>::failure(
                ServiceError::new(Status::ServerError, "banco indisponível"),
            ))
            .unwrap();
        reply(stream, out).await;
    });

    let request = RequestEnvelope::with_token(StatusRequest::new(true), "tok");
    let response: ResponseEnvelope<StatusResponse> =
        request_tcp(&addr.to_string(), &request, &BinaryCodec)
            .await
            .unwrap();

    assert_eq!(response.status(), Status::ServerError);
    assert!(response.body().is_none());
    assert_eq!(response.error().unwrap().message, "banco indisponível");
}

#[tokio::test]
async fn reply_split_across_writes_is_reassembled() {
    let (listener, addr) = get_listener().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = read_frame(&mut stream, Framing::LengthPrefixed, MAX_FRAME_SIZE)
            .await
            .unwrap();
        let out = BinaryCodec
            .encode_response(&ResponseEnvelope::success(logout_response()))
            .unwrap();
        for part in out.chunks(3) {
            stream.write_all(part).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let client = AppLayerClient::tcp(BinaryCodec);
    let logout = client
        .logout(&addr.to_string(), &LogoutRequest, "tok")
        .await
        .unwrap();
    assert_eq!(logout, logout_response());
}

#[tokio::test]
async fn tcp_receive_timeout_fires() {
    let (listener, addr) = get_listener().await;

    // Spawn server that never responds
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let transport = TcpTransport::builder()
        .receive_timeout(Duration::from_millis(100))
        .build();
    let result = transport
        .request_reply(&addr.to_string(), b"LOGOUT|token=1|FIM\n", Framing::Terminated)
        .await;

    match result {
        Err(Error::Timeout(phase)) => assert_eq!(phase, "Receive"),
        other => panic!("Expected timeout error, got {other:?}"),
    }
}

#[tokio::test]
async fn tcp_early_close_is_reported() {
    let (listener, addr) = get_listener().await;

    tokio::spawn(async move {
        let (mut stream, _) = accept_request(&listener, Framing::Terminated).await;
        stream.write_all(b"OK|msg=Logout realizado").await.unwrap();
        // Dropping the stream closes it mid-message
    });

    let result = TcpTransport::new()
        .request_reply(&addr.to_string(), b"LOGOUT|token=1|FIM\n", Framing::Terminated)
        .await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));
}

#[tokio::test]
async fn tcp_rejects_oversized_frame() {
    let (listener, addr) = get_listener().await;

    // Frame header claiming 200MB
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_u32(200 * 1024 * 1024).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let result = TcpTransport::new()
        .request_reply(&addr.to_string(), &[0, 0, 0, 0], Framing::LengthPrefixed)
        .await;
    match result {
        Err(Error::InvalidFrame(msg)) => assert!(msg.contains("too large")),
        other => panic!("Expected InvalidFrame error, got {other:?}"),
    }
}

#[tokio::test]
async fn connect_failure_names_the_address() {
    let (listener, addr) = get_listener().await;
    drop(listener);

    let result = TcpTransport::new()
        .request_reply(&addr.to_string(), b"x", Framing::Terminated)
        .await;
    match result {
        Err(Error::Connect { address, .. }) => assert_eq!(address, addr.to_string()),
        other => panic!("Expected connect error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_aborts_an_in_flight_call() {
    let (listener, addr) = get_listener().await;
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let token = CancellationToken::new();
    let transport = TcpTransport::builder()
        .cancellation_token(token.clone())
        .build();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let started = tokio::time::Instant::now();
    let result = transport
        .request_reply(&addr.to_string(), b"{\"tipo\":\"logout\"}", Framing::JsonValue)
        .await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
