#![allow(dead_code)]

use appstore_connect_mcp::config::AppConfig;
use appstore_connect_mcp::errors::ToolError;
use appstore_connect_mcp::services::appstore_client::{ApiRequest, ApiTransport, Download};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const TEST_KEY_ID: &str = "2X9R4HXF34";
pub const TEST_ISSUER_ID: &str = "57246542-96fe-1a63-e053-0824d011072a";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig::new(
        TEST_KEY_ID,
        TEST_ISSUER_ID,
        fixture_path("AuthKey_TEST.p8").display().to_string(),
    )
    .with_api_base_url(base_url)
}

/// Records every request and answers from a queue of canned results.
/// An empty queue answers `{"data": []}`.
#[derive(Default)]
pub struct RecordingTransport {
    requests: StdMutex<Vec<ApiRequest>>,
    responses: StdMutex<VecDeque<Result<Value, ToolError>>>,
    downloads: StdMutex<VecDeque<Result<Download, ToolError>>>,
    downloaded_urls: StdMutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn fail(&self, err: ToolError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn respond_download(&self, download: Download) {
        self.downloads.lock().unwrap().push_back(Ok(download));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn only_request(&self) -> ApiRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request: {:?}", requests);
        requests.into_iter().next().unwrap()
    }

    pub fn downloaded_urls(&self) -> Vec<String> {
        self.downloaded_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiTransport for RecordingTransport {
    async fn request(&self, request: ApiRequest) -> Result<Value, ToolError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(serde_json::json!({ "data": [] })))
    }

    async fn download_from_url(&self, url: &str) -> Result<Download, ToolError> {
        self.downloaded_urls.lock().unwrap().push(url.to_string());
        self.downloads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ToolError::internal("no canned download")))
    }
}

/// What the one-shot server saw on the wire.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Serves exactly one HTTP/1.1 response, then returns the captured request.
/// The returned string is `http://127.0.0.1:<port>`.
pub async fn serve_once(
    status: u16,
    content_type: &str,
    body: Vec<u8>,
) -> (String, JoinHandle<CapturedRequest>) {
    serve(status, content_type, body, true).await
}

/// Like [`serve_once`] but without `Content-Length`: the body is delimited
/// by closing the connection, so the client only learns its size by reading.
pub async fn serve_once_unsized(
    content_type: &str,
    body: Vec<u8>,
) -> (String, JoinHandle<CapturedRequest>) {
    serve(200, content_type, body, false).await
}

async fn serve(
    status: u16,
    content_type: &str,
    body: Vec<u8>,
    with_length: bool,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let content_type = content_type.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let length = if with_length {
            format!("Content-Length: {}\r\n", body.len())
        } else {
            String::new()
        };
        let head = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: {}\r\n{}Connection: close\r\n\r\n",
            status, content_type, length
        );
        // The client may hang up once it has seen enough.
        let _ = socket.write_all(head.as_bytes()).await;
        for chunk in body.chunks(512) {
            if socket.write_all(chunk).await.is_err() {
                break;
            }
        }
        socket.shutdown().await.ok();
        captured
    });
    (format!("http://{}", addr), handle)
}

/// Accepts connections and never answers.
pub async fn serve_stalled() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break raw.len();
        }
        raw.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subslice(&raw, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end.min(raw.len())]).to_string();
    let mut lines = head.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = raw[header_end.min(raw.len())..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        request_line,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
