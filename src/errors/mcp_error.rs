use serde::Serialize;
use std::fmt;

/// JSON-RPC 2.0 error codes this server can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Protocol-level failure, serialized into the `error` member of a response.
#[derive(Debug, Clone, Serialize)]
pub struct McpError {
    pub code: ErrorCode,
    pub message: String,
}

impl McpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(ErrorCode::InvalidRequest, "Invalid request")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    /// `tools/call` for a name that is not in the catalog. Close matches are
    /// appended as a "Did you mean" line.
    pub fn unknown_tool(name: &str, suggestions: &[String]) -> Self {
        let mut message = format!("Unknown tool: {}", name);
        if !suggestions.is_empty() {
            message.push_str(&format!("\nDid you mean: {}?", suggestions.join(", ")));
        }
        Self::new(ErrorCode::MethodNotFound, message)
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code.as_i32())
    }
}

impl std::error::Error for McpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_lists_suggestions_only_when_present() {
        let bare = McpError::unknown_tool("upload_build", &[]);
        assert_eq!(bare.code, ErrorCode::MethodNotFound);
        assert_eq!(bare.message, "Unknown tool: upload_build");

        let hinted = McpError::unknown_tool("list_app", &["list_apps".to_string()]);
        assert_eq!(hinted.message, "Unknown tool: list_app\nDid you mean: list_apps?");
    }

    #[test]
    fn display_carries_the_numeric_code() {
        assert_eq!(McpError::parse_error().to_string(), "Parse error (-32700)");
    }
}
