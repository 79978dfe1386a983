use crate::config::AppConfig;
use crate::constants::{network as network_constants, protocols::ALLOWED_HTTP};
use crate::errors::ToolError;
use crate::services::credentials::CredentialMinter;
use crate::services::logger::Logger;
use crate::utils::redact::redact_text;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Flat JSON-API query map (`filter[name]`, `fields[devices]`, `include`, ...).
pub type QueryParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// One outbound API call. `path` is relative to the versioned base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: QueryParams,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw bytes from a pre-signed download link.
#[derive(Debug, Clone)]
pub struct Download {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub size: u64,
}

impl Download {
    /// Text payloads stay readable; anything else is base64-encoded.
    pub fn to_value(&self) -> Value {
        let (data, encoding) = match std::str::from_utf8(&self.data) {
            Ok(text) => (text.to_string(), "utf8"),
            Err(_) => (
                base64::engine::general_purpose::STANDARD.encode(&self.data),
                "base64",
            ),
        };
        serde_json::json!({
            "data": data,
            "encoding": encoding,
            "contentType": self.content_type,
            "size": self.size,
        })
    }
}

/// Authenticated access to the remote API. Managers only see this trait.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn request(&self, request: ApiRequest) -> Result<Value, ToolError>;

    async fn download_from_url(&self, url: &str) -> Result<Download, ToolError>;

    async fn get(&self, path: &str, query: QueryParams) -> Result<Value, ToolError> {
        self.request(ApiRequest::new(HttpMethod::Get, path).with_query(query))
            .await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ToolError> {
        self.request(ApiRequest::new(HttpMethod::Post, path).with_body(body))
            .await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, ToolError> {
        self.request(ApiRequest::new(HttpMethod::Put, path).with_body(body))
            .await
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, ToolError> {
        let mut request = ApiRequest::new(HttpMethod::Delete, path);
        request.body = body;
        self.request(request).await
    }
}

pub struct AppStoreClient {
    logger: Logger,
    http: Client,
    base_url: String,
    credentials: Arc<CredentialMinter>,
}

impl AppStoreClient {
    pub fn new(
        logger: Logger,
        config: &AppConfig,
        credentials: Arc<CredentialMinter>,
    ) -> Result<Self, ToolError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(network_constants::TIMEOUT_API_REQUEST_MS))
            .connect_timeout(Duration::from_millis(network_constants::TIMEOUT_CONNECTION_MS))
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("api"),
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn bearer(&self) -> Result<String, ToolError> {
        self.credentials.token().await.map_err(ToolError::from)
    }
}

#[async_trait]
impl ApiTransport for AppStoreClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, ToolError> {
        let token = self.bearer().await?;
        let url = self.build_url(&request.path);
        self.logger.debug(
            "API request",
            Some(&serde_json::json!({
                "method": request.method.as_str(),
                "path": request.path,
                "query": serde_urlencoded::to_string(&request.query).unwrap_or_default(),
            })),
        );

        let mut builder = self
            .http
            .request(request.method.to_reqwest(), &url)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let payload = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let detail = remote_error_detail(status, &payload);
            self.logger.warn(
                "API request failed",
                Some(&serde_json::json!({
                    "method": request.method.as_str(),
                    "path": request.path,
                    "status": status.as_u16(),
                    "detail": redact_text(&detail, 512),
                })),
            );
            return Err(ToolError::remote_api(status.as_u16(), detail));
        }

        self.logger.debug(
            "API response",
            Some(&serde_json::json!({
                "status": status.as_u16(),
                "bytes": payload.len(),
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );
        Ok(decode_success_body(&headers, payload))
    }

    async fn download_from_url(&self, url: &str) -> Result<Download, ToolError> {
        let parsed = parse_download_url(url)?;
        let token = self.bearer().await?;
        let response = self
            .http
            .get(parsed)
            .bearer_auth(&token)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let payload = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(ToolError::remote_api(
                status.as_u16(),
                remote_error_detail(status, &payload),
            ));
        }
        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(payload.len() as u64);
        Ok(Download {
            content_type: header_string(&headers, CONTENT_TYPE.as_str()),
            size,
            data: payload,
        })
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// JSON bodies are parsed; an empty body (204 on DELETE) becomes `null`;
/// anything else (gzip reports) is handed back as a raw download value.
pub(crate) fn decode_success_body(headers: &HeaderMap, payload: Bytes) -> Value {
    if payload.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_slice::<Value>(&payload) {
        return parsed;
    }
    let size = payload.len() as u64;
    Download {
        content_type: header_string(headers, CONTENT_TYPE.as_str()),
        size,
        data: payload,
    }
    .to_value()
}

/// First `errors[].detail` of a JSON-API error document, falling back to the
/// generic status line.
pub(crate) fn remote_error_detail(status: StatusCode, payload: &[u8]) -> String {
    serde_json::from_slice::<Value>(payload)
        .ok()
        .and_then(|body| {
            body.get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| first.get("detail"))
                .and_then(|detail| detail.as_str())
                .map(|detail| detail.to_string())
        })
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        return ToolError::transport("HTTP request timed out").with_retryable(true);
    }
    if err.is_connect() {
        return ToolError::transport(format!("Connection failed: {}", err)).with_retryable(true);
    }
    ToolError::transport(err.to_string())
}

pub(crate) fn parse_download_url(raw: &str) -> Result<Url, ToolError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|_| ToolError::invalid_parameter(format!("Invalid URL: {}", raw)))?;
    if !scheme_allowed(parsed.scheme()) {
        return Err(ToolError::invalid_parameter(
            "Only http/https URLs are supported",
        ));
    }
    Ok(parsed)
}

fn scheme_allowed(scheme: &str) -> bool {
    let normalized = scheme.trim_end_matches(':');
    ALLOWED_HTTP
        .iter()
        .any(|allowed| allowed.trim_end_matches(':') == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolErrorKind;

    #[test]
    fn remote_error_detail_prefers_first_structured_detail() {
        let body = br#"{"errors":[{"status":"409","detail":"A bundle ID with this identifier already exists."},{"detail":"second"}]}"#;
        assert_eq!(
            remote_error_detail(StatusCode::CONFLICT, body),
            "A bundle ID with this identifier already exists."
        );
        assert_eq!(
            remote_error_detail(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>"),
            "Request failed with status code 502"
        );
        assert_eq!(
            remote_error_detail(StatusCode::FORBIDDEN, br#"{"errors":[]}"#),
            "Request failed with status code 403"
        );
    }

    #[test]
    fn success_body_decoding_handles_json_empty_and_binary() {
        let headers = HeaderMap::new();
        assert_eq!(
            decode_success_body(&headers, Bytes::from_static(br#"{"data":[]}"#)),
            serde_json::json!({"data": []})
        );
        assert_eq!(decode_success_body(&headers, Bytes::new()), Value::Null);

        let mut gzip_headers = HeaderMap::new();
        gzip_headers.insert(CONTENT_TYPE, "application/a-gzip".parse().unwrap());
        let raw = decode_success_body(&gzip_headers, Bytes::from_static(&[0x1f, 0x8b, 0x08, 0xff]));
        assert_eq!(raw["encoding"], "base64");
        assert_eq!(raw["contentType"], "application/a-gzip");
        assert_eq!(raw["size"], 4);
    }

    #[test]
    fn download_urls_must_be_http() {
        assert!(parse_download_url("https://example.com/segment.gz").is_ok());
        let err = parse_download_url("file:///etc/passwd").unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidParameter);
        assert!(parse_download_url("not a url").is_err());
    }
}
