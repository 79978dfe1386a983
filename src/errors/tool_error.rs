use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    MissingParameter,
    InvalidParameter,
    Configuration,
    KeyRead,
    NotFound,
    RemoteApi,
    Transport,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            status: None,
            hint: None,
            details: None,
            retryable: false,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::MissingParameter, "MISSING_PARAMETER", message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParameter, "INVALID_PARAMETER", message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Configuration, "CONFIGURATION", message)
    }

    pub fn key_read(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::KeyRead, "KEY_READ", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, "NOT_FOUND", message)
    }

    /// A structured error returned by the remote API. `detail` is the first
    /// `errors[].detail` string when the body had one.
    pub fn remote_api(status: u16, detail: impl Into<String>) -> Self {
        let mut err = Self::new(ToolErrorKind::RemoteApi, "REMOTE_API", detail);
        err.status = Some(status);
        err.retryable = matches!(status, 429 | 500 | 502 | 503 | 504);
        err
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Transport, "TRANSPORT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, "INTERNAL", message)
    }

    /// Remote and transport failures are reported to the caller with a
    /// uniform API prefix; everything else keeps its own message.
    pub fn is_api_failure(&self) -> bool {
        matches!(self.kind, ToolErrorKind::RemoteApi | ToolErrorKind::Transport)
    }

    /// Broken setup on this side (credentials, key file, bugs) rather than
    /// a bad argument or a remote refusal.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self.kind,
            ToolErrorKind::Configuration | ToolErrorKind::KeyRead | ToolErrorKind::Internal
        )
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::internal(format!("JSON serialization failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_api_marks_throttling_and_server_errors_retryable() {
        assert!(ToolError::remote_api(429, "slow down").retryable);
        assert!(ToolError::remote_api(503, "unavailable").retryable);
        assert!(!ToolError::remote_api(409, "conflict").retryable);
        assert_eq!(ToolError::remote_api(404, "gone").status, Some(404));
    }

    #[test]
    fn only_remote_and_transport_errors_are_api_failures() {
        assert!(ToolError::remote_api(400, "bad").is_api_failure());
        assert!(ToolError::transport("dns").is_api_failure());
        assert!(!ToolError::not_found("nope").is_api_failure());
        assert!(!ToolError::missing_parameter("appId").is_api_failure());
    }

    #[test]
    fn setup_failures_are_server_faults() {
        assert!(ToolError::configuration("Vendor number is required.").is_server_fault());
        assert!(ToolError::internal("no handler").is_server_fault());
        assert!(!ToolError::remote_api(409, "conflict").is_server_fault());
        assert!(!ToolError::invalid_parameter("Invalid sort").is_server_fault());
    }
}
