//! Shared test helpers: a one-shot fake Gemini endpoint on localhost.
#![allow(dead_code)]

use mindscape_lib::config::ModelSettings;
use mindscape_lib::llm::{Credential, GeminiAnalyzer};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const TEST_KEY: &str = "test-key-123";

/// What the fake endpoint answers with.
pub enum Reply {
    /// 200 + the given SSE events, written one at a time.
    Events(Vec<String>),
    /// 200 + the events, then the connection drops mid-body.
    Truncated(Vec<String>),
    /// A non-2xx status with a JSON body.
    Status(u16, String),
}

/// The request the fake endpoint received.
#[derive(Debug)]
pub struct CapturedRequest {
    pub request_line: String,
    pub body: serde_json::Value,
}

pub struct MockGemini {
    pub base_url: String,
    pub handle: JoinHandle<Option<CapturedRequest>>,
}

impl MockGemini {
    /// Bind to an ephemeral port and serve exactly one request.
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.ok()?;
            let captured = read_request(&mut socket).await?;
            write_reply(socket, reply).await;
            Some(captured)
        });
        Self {
            base_url: format!("http://{}/v1beta", addr),
            handle,
        }
    }

    pub fn analyzer(&self, key: &str) -> GeminiAnalyzer {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        GeminiAnalyzer::with_client(
            client,
            ModelSettings {
                base_url: self.base_url.clone(),
                ..Default::default()
            },
            Credential::Fixed(key.to_string()),
        )
    }

    /// The captured request, once the exchange is over.
    pub async fn request(self) -> CapturedRequest {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("fake endpoint never finished")
            .unwrap()
            .expect("fake endpoint got no request")
    }

    /// True if nobody connected within a short grace period.
    pub async fn was_never_called(self) -> bool {
        let handle = self.handle;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let untouched = !handle.is_finished();
        handle.abort();
        untouched
    }
}

/// One SSE event carrying a text fragment.
pub fn text_event(text: &str) -> String {
    sse(serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    }))
}

/// The closing event: last fragment, STOP, and token usage.
pub fn final_event(text: &str) -> String {
    sse(serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 1290, "candidatesTokenCount": 42 }
    }))
}

pub fn sse(value: serde_json::Value) -> String {
    format!("data: {}\r\n\r\n", value)
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];

    let header_end = loop {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let end = (header_end + content_length).min(buf.len());
    Some(CapturedRequest {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: serde_json::from_slice(&buf[header_end..end]).unwrap_or(serde_json::Value::Null),
    })
}

async fn write_reply(mut socket: TcpStream, reply: Reply) {
    match reply {
        Reply::Events(events) => {
            let len: usize = events.iter().map(String::len).sum();
            write_events(&mut socket, len, &events).await;
            let _ = socket.shutdown().await;
        }
        Reply::Truncated(events) => {
            let len: usize = events.iter().map(String::len).sum();
            write_events(&mut socket, len + 64, &events).await;
            // Dropping the socket here cuts the body short.
        }
        Reply::Status(code, body) => {
            let head = format!(
                "HTTP/1.1 {} Error\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                code,
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    }
}

async fn write_events(socket: &mut TcpStream, content_length: usize, events: &[String]) {
    let head = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        content_length
    );
    let _ = socket.write_all(head.as_bytes()).await;
    for event in events {
        let _ = socket.write_all(event.as_bytes()).await;
        let _ = socket.flush().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
