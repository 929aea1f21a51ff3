//! HTTP exchange tests
//!
//! `AiClient` against a one-shot local listener: what goes on the wire for
//! each provider, and how non-2xx statuses, dead endpoints and aborts map to
//! errors.

use murmur::llm::{AiClient, AiConfig, ChatBackend, ConversationMessage, Provider};
use murmur::MurmurError;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// The parts of a request the tests look at
#[derive(Debug)]
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: serde_json::Value,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

async fn bind() -> Option<TcpListener> {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => Some(listener),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => None,
        Err(err) => panic!("failed to bind local test listener: {err}"),
    }
}

/// Read one request off `socket`: headers, then `Content-Length` bytes of body
async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before headers");
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let length: usize = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(0);
    let body_start = head_end + 4;
    while raw.len() < body_start + length {
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before body");
        raw.extend_from_slice(&buf[..n]);
    }

    let body = serde_json::from_slice(&raw[body_start..body_start + length])
        .unwrap_or(serde_json::Value::Null);
    Captured {
        request_line,
        headers,
        body,
    }
}

/// Answer a single request with `status` and `body`; the handle yields what was sent
async fn serve_once(status: &str, body: &str) -> Option<(String, JoinHandle<Captured>)> {
    let listener = bind().await?;
    let addr = listener.local_addr().unwrap();

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let _ = socket.write_all(&response).await;
        let _ = socket.shutdown().await;
        captured
    });

    Some((format!("http://{addr}"), handle))
}

fn history() -> Vec<ConversationMessage> {
    vec![
        ConversationMessage::user("Hello"),
        ConversationMessage::assistant("Hi"),
        ConversationMessage::user("你好"),
    ]
}

#[tokio::test]
async fn test_openai_sends_bearer_key() {
    let Some((base, server)) = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#,
    )
    .await
    else {
        return;
    };

    let config = AiConfig::new(Provider::OpenAi)
        .with_api_key("sk-test")
        .with_model("gpt-4o-mini")
        .with_endpoint(format!("{base}/"));
    let client = AiClient::new(config).unwrap();

    let reply = client.complete(&history()).await.unwrap();
    assert_eq!(reply, "Hi there");

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /v1/chat/completions HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
    assert!(!request.request_line.contains("key="));
    assert_eq!(request.body["model"], "gpt-4o-mini");
    assert_eq!(request.body["messages"].as_array().unwrap().len(), 3);
    assert_eq!(request.body["messages"][2]["content"], "你好");
    assert!(!client.is_busy());
}

#[tokio::test]
async fn test_gemini_sends_key_as_query_parameter() {
    let Some((base, server)) = serve_once(
        "200 OK",
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"你好呀"}]}}]}"#,
    )
    .await
    else {
        return;
    };

    let config = AiConfig::new(Provider::Gemini)
        .with_api_key("g-key")
        .with_model("gemini-test")
        .with_endpoint(base);
    let client = AiClient::new(config).unwrap();

    let reply = client.complete(&history()).await.unwrap();
    assert_eq!(reply, "你好呀");

    let request = server.await.unwrap();
    assert_eq!(
        request.request_line,
        "POST /v1beta/models/gemini-test:generateContent?key=g-key HTTP/1.1"
    );
    assert_eq!(request.header("authorization"), None);
    assert_eq!(request.body["contents"][1]["role"], "model");
}

#[tokio::test]
async fn test_unauthorized_maps_to_provider_error() {
    let Some((base, server)) = serve_once(
        "401 Unauthorized",
        r#"{"error":{"message":"Incorrect API key provided"}}"#,
    )
    .await
    else {
        return;
    };

    let config = AiConfig::new(Provider::OpenAi)
        .with_api_key("sk-wrong")
        .with_endpoint(base);
    let client = AiClient::new(config).unwrap();

    let err = client.complete(&history()).await.unwrap_err();
    assert_eq!(
        err,
        MurmurError::ProviderError {
            provider: "OpenAI".into(),
            status: Some(401),
            message: "Incorrect API key provided".into(),
        }
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let Some(listener) = bind().await else {
        return;
    };
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = AiConfig::new(Provider::Gemini)
        .with_api_key("g-key")
        .with_endpoint(format!("http://{addr}"));
    let client = AiClient::new(config).unwrap();

    let err = client.complete(&history()).await.unwrap_err();
    assert!(matches!(err, MurmurError::Network(_)), "got {err:?}");
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_abort_mid_request() {
    let Some(listener) = bind().await else {
        return;
    };
    let addr = listener.local_addr().unwrap();

    // Accept and read, then hold the connection without answering
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let config = AiConfig::new(Provider::OpenAi)
        .with_api_key("sk-test")
        .with_endpoint(format!("http://{addr}"));
    let client = Arc::new(AiClient::new(config).unwrap());

    let call = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.complete(&history()).await }
    });

    for _ in 0..200 {
        if client.is_busy() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(client.is_busy());

    client.abort();
    let result = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("abort did not end the call")
        .unwrap();

    assert_eq!(result, Err(MurmurError::Aborted));
    assert!(!client.is_busy());
    server.abort();
}
