use crate::constants::screenshots::{FALLBACK_MIME, MAX_BYTES, TIMEOUT_MS};
use crate::errors::ToolError;
use crate::services::appstore_client::{map_reqwest_error, parse_download_url};
use crate::services::logger::Logger;
use base64::Engine;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// An image ready to be inlined into a tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub data_base64: String,
    pub mime_type: String,
    pub bytes: usize,
}

/// Result of the best-effort screenshot fetch. `Skipped` carries the reason
/// the image was left out; the caller still returns the JSON resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotOutcome {
    Attached(InlineImage),
    Skipped(String),
}

/// Fetches pre-signed screenshot URLs directly (no API token) under a fixed
/// timeout and size ceiling.
#[derive(Clone)]
pub struct ScreenshotFetcher {
    logger: Logger,
    http: Client,
    max_bytes: usize,
}

impl ScreenshotFetcher {
    pub fn new(logger: Logger) -> Result<Self, ToolError> {
        Self::with_limits(logger, Duration::from_millis(TIMEOUT_MS), MAX_BYTES)
    }

    pub fn with_limits(
        logger: Logger,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<Self, ToolError> {
        let http = Client::builder().timeout(timeout).build().map_err(|err| {
            ToolError::internal(format!("Failed to build screenshot client: {}", err))
        })?;
        Ok(Self {
            logger: logger.child("screenshot"),
            http,
            max_bytes,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<InlineImage, ToolError> {
        let parsed = parse_download_url(url)?;
        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::remote_api(
                status.as_u16(),
                format!("Screenshot download failed with status code {}", status.as_u16()),
            ));
        }
        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(self.too_large());
            }
        }
        let header_mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_lowercase())
            .filter(|v| v.starts_with("image/"));

        let mut buffer = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if buffer.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large());
            }
            buffer.extend_from_slice(&chunk);
        }

        let mime_type = header_mime
            .or_else(|| mime_from_url(url))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        Ok(InlineImage {
            data_base64: base64::engine::general_purpose::STANDARD.encode(&buffer),
            mime_type,
            bytes: buffer.len(),
        })
    }

    /// Never fails: any error is logged and turned into `Skipped`.
    pub async fn fetch_or_skip(&self, url: &str) -> ScreenshotOutcome {
        match self.fetch(url).await {
            Ok(image) => ScreenshotOutcome::Attached(image),
            Err(err) => {
                self.logger.warn(
                    "Screenshot download failed; returning metadata only",
                    Some(&serde_json::json!({"code": err.code, "message": err.message})),
                );
                ScreenshotOutcome::Skipped(err.message)
            }
        }
    }

    fn too_large(&self) -> ToolError {
        ToolError::internal(format!(
            "Screenshot exceeds the {} byte limit",
            self.max_bytes
        ))
    }
}

/// First screenshot URL of a `betaFeedbackScreenshotSubmissions` resource.
/// Template URLs (`{w}x{h}bb.{f}`) are filled from the asset's own size.
pub fn screenshot_url(resource: &Value) -> Option<String> {
    let first = resource
        .pointer("/data/attributes/screenshots")
        .and_then(|v| v.as_array())
        .and_then(|items| items.first())?;
    if let Some(url) = first.get("url").and_then(|v| v.as_str()) {
        if !url.trim().is_empty() {
            return Some(url.trim().to_string());
        }
    }
    let template = first.get("templateUrl").and_then(|v| v.as_str())?;
    let width = first.get("width").and_then(|v| v.as_u64()).unwrap_or(0);
    let height = first.get("height").and_then(|v| v.as_u64()).unwrap_or(0);
    Some(
        template
            .replace("{w}", &width.to_string())
            .replace("{h}", &height.to_string())
            .replace("{f}", "png"),
    )
}

fn mime_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let extension = path.rsplit('.').next()?.to_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => return None,
    };
    Some(mime.to_string())
}
