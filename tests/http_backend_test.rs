//! `RafikiClient` against a throwaway HTTP server on localhost

use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use rafiki::backend::{BackendError, ChatBackend, ChatRequest, Feedback, FeedbackKind};
use rafiki::{RafikiClient, Turn};

/// A captured HTTP request
struct Captured {
    head: String,
    body: String,
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed mid-body");
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();
    Captured { head, body }
}

/// Serve exactly one canned response and hand back what the client sent
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        captured
    });

    (format!("http://{}/api", addr), handle)
}

fn request() -> ChatRequest {
    ChatRequest {
        message: "My portal account is locked".into(),
        history: vec![
            Turn::user("hi"),
            Turn::assistant("Hello!"),
            Turn::user("My portal account is locked"),
        ],
    }
}

#[tokio::test]
async fn chat_posts_json_and_reads_response() {
    let (base, server) = serve_once("200 OK", r#"{"response": "Call extension 303"}"#).await;
    let client = RafikiClient::new(&base);

    let reply = client.send(&request()).await.unwrap();
    assert_eq!(reply.response, "Call extension 303");

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /api/chat HTTP/1.1"));
    assert!(captured.head.to_ascii_lowercase().contains("content-type: application/json"));

    let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "message": "My portal account is locked",
            "history": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "Hello!"},
                {"role": "user", "content": "My portal account is locked"}
            ]
        })
    );
}

#[tokio::test]
async fn error_status_is_rejected() {
    let (base, server) = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;
    let client = RafikiClient::new(&base);

    let err = client.send(&request()).await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected { status: 500 }), "{err:?}");
    assert!(!err.is_transport());
    server.await.unwrap();
}

#[tokio::test]
async fn ok_without_response_field_is_malformed() {
    let (base, server) = serve_once("200 OK", r#"{"answer": "wrong key"}"#).await;
    let client = RafikiClient::new(&base);

    let err = client.send(&request()).await.unwrap_err();
    assert!(matches!(err, BackendError::Malformed(_)), "{err:?}");
    assert!(!err.is_transport());
    server.await.unwrap();
}

#[tokio::test]
async fn ok_with_non_json_body_is_malformed() {
    let (base, server) = serve_once("200 OK", "<html>gateway</html>").await;
    let client = RafikiClient::new(&base);

    let err = client.send(&request()).await.unwrap_err();
    assert!(matches!(err, BackendError::Malformed(_)), "{err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_transport() {
    // Grab a free port, then close it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RafikiClient::new(&format!("http://{}", addr));
    let err = client.send(&request()).await.unwrap_err();
    assert!(err.is_transport(), "{err:?}");
}

#[tokio::test]
async fn health_reads_status() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"status": "online", "service": "Rafiki IT Backend", "chatbot_mode": "builtin"}"#,
    )
    .await;
    let client = RafikiClient::new(&base);

    let status = client.health().await.unwrap();
    assert!(status.is_online());
    assert!(status.is_limited());

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("GET /api/health HTTP/1.1"));
}

#[tokio::test]
async fn feedback_posts_camel_case_payload() {
    let (base, server) = serve_once("200 OK", r#"{"success": true, "message": "Thank you for your feedback!"}"#).await;
    let client = RafikiClient::new(&base);

    let feedback = Feedback {
        message_index: 1,
        message_content: Some("Call extension 303".into()),
        feedback_type: FeedbackKind::Positive,
        feedback_reason: Some("clear steps".into()),
        timestamp: "2026-10-17T09:00:00+00:00".into(),
    };
    let ack = client.send_feedback(&feedback).await.unwrap();
    assert!(ack.success);

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /api/feedback HTTP/1.1"));
    let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body["messageIndex"], 1);
    assert_eq!(body["feedbackType"], "positive");
    assert_eq!(body["feedbackReason"], "clear steps");
}
