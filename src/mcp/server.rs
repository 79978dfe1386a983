use crate::app::App;
use crate::config::AppConfig;
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::mcp::catalog::{list_tools, suggest_tool_names, tool_by_name, validate_tool_args};
use crate::mcp::envelope::build_tool_result;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::services::logger::Logger;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "appstore-connect";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const API_ERROR_PREFIX: &str = "App Store Connect API error: ";

/// Translates a handler failure into the JSON-RPC error the client sees.
pub fn map_tool_error(error: &ToolError) -> McpError {
    let mut message = if error.is_api_failure() {
        format!("{}{}", API_ERROR_PREFIX, error.message)
    } else {
        error.message.clone()
    };
    if let Some(hint) = &error.hint {
        message.push_str(&format!("\nhint: {}", hint));
    }

    let code = match error.kind {
        ToolErrorKind::MissingParameter | ToolErrorKind::InvalidParameter => {
            ErrorCode::InvalidParams
        }
        ToolErrorKind::NotFound => ErrorCode::InvalidRequest,
        ToolErrorKind::Configuration
        | ToolErrorKind::KeyRead
        | ToolErrorKind::RemoteApi
        | ToolErrorKind::Transport
        | ToolErrorKind::Internal => ErrorCode::InternalError,
    };
    McpError::new(code, message)
}

pub struct McpServer {
    app: Arc<App>,
    logger: Logger,
}

impl McpServer {
    pub fn new(app: App) -> Self {
        let logger = app.logger.child("mcp");
        Self {
            app: Arc::new(app),
            logger,
        }
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": list_tools(self.app.vendor_configured()) })
    }

    async fn handle_tools_call(&self, name: &str, raw_args: Value) -> Result<Value, McpError> {
        if tool_by_name(name).is_none() || !self.app.tool_executor.has_tool(name) {
            let suggestions = suggest_tool_names(name, self.app.vendor_configured());
            return Err(McpError::unknown_tool(name, &suggestions));
        }

        let args = if raw_args.is_null() {
            Value::Object(Default::default())
        } else {
            raw_args
        };
        validate_tool_args(name, &args)?;

        let output = self
            .app
            .tool_executor
            .execute(name, args)
            .await
            .map_err(|err| map_tool_error(&err))?;
        Ok(build_tool_result(&output))
    }

    /// Handles one inbound line. `None` means nothing is written back
    /// (notifications and blank lines).
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let parsed: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => {
                return Some(JsonRpcResponse::failure(Value::Null, McpError::parse_error()))
            }
        };
        let request: JsonRpcRequest = match serde_json::from_value(parsed) {
            Ok(request) => request,
            Err(_) => {
                return Some(JsonRpcResponse::failure(Value::Null, McpError::invalid_request()))
            }
        };
        if request.is_notification() {
            self.logger.debug(
                "Notification",
                Some(&serde_json::json!({ "method": request.method })),
            );
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => {
                let params = request.params.as_object().cloned().unwrap_or_default();
                let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                if name.is_empty() {
                    Err(McpError::invalid_params("Missing tool name"))
                } else {
                    let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                    self.handle_tools_call(name, args).await
                }
            }
            other => Err(McpError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::failure(id, err),
        })
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);

        self.logger.info(
            "Server ready",
            Some(&serde_json::json!({
                "tools": self.app.tool_executor.tool_names().len(),
                "vendor_configured": self.app.vendor_configured(),
            })),
        );

        while let Some(line) = reader.next_line().await? {
            if let Some(response) = self.handle_message(&line).await {
                write_response(&mut writer, &response).await?;
            }
        }
        self.logger.info("Input closed, shutting down", None);
        Ok(())
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> Result<(), ToolError> {
    let payload = serde_json::to_string(response)?;
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn run_stdio(config: AppConfig) -> Result<(), ToolError> {
    let app = App::initialize(config)?;
    McpServer::new(app).run_stdio().await
}
