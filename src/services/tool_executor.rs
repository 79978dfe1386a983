use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::services::screenshot::InlineImage;
use crate::utils::redact::redact_object;

use serde_json::Value;

/// What a tool hands back to the dispatcher. The image variant only comes
/// from the feedback-screenshot tool when the secondary download succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Json(Value),
    WithImage { resource: Value, image: InlineImage },
}

impl ToolOutput {
    pub fn resource(&self) -> &Value {
        match self {
            ToolOutput::Json(value) => value,
            ToolOutput::WithImage { resource, .. } => resource,
        }
    }

    pub fn image(&self) -> Option<&InlineImage> {
        match self {
            ToolOutput::Json(_) => None,
            ToolOutput::WithImage { image, .. } => Some(image),
        }
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError>;
}

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
        }
    }

    pub fn has_tool(&self, tool: &str) -> bool {
        self.handlers.contains_key(tool)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Runs exactly one handler call. No retries: every failure goes straight
    /// back to the caller.
    pub async fn execute(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let handler = self
            .handlers
            .get(tool)
            .cloned()
            .ok_or_else(|| ToolError::internal(format!("No handler registered for {}", tool)))?;

        let trace_id = uuid::Uuid::new_v4().to_string();
        self.logger.debug(
            "Tool call",
            Some(&serde_json::json!({
                "tool": tool,
                "trace_id": trace_id,
                "args": redact_object(&args, 256),
            })),
        );

        let started = Instant::now();
        let result = handler.handle(tool, args).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(output) => self.logger.info(
                "Tool call succeeded",
                Some(&serde_json::json!({
                    "tool": tool,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                    "image": output.image().map(|image| image.bytes),
                })),
            ),
            Err(err) => {
                let meta = serde_json::json!({
                    "tool": tool,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                    "code": err.code,
                    "status": err.status,
                });
                if err.is_server_fault() {
                    self.logger.error("Tool call failed", Some(&meta));
                } else {
                    self.logger.warn("Tool call failed", Some(&meta));
                }
            }
        }
        result
    }
}
