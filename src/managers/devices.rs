use crate::constants::limits::MAX_LIMIT;
use crate::errors::ToolError;
use crate::services::appstore_client::ApiTransport;
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolHandler, ToolOutput};
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_tool_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const DEVICE_TOOLS: &[&str] = &["list_devices"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDevicesArgs {
    limit: Option<Value>,
    sort: Option<String>,
    filter: Option<Value>,
    fields: Option<Value>,
}

#[derive(Clone)]
pub struct DevicesManager {
    logger: Logger,
    validation: Validation,
    api: Arc<dyn ApiTransport>,
}

impl DevicesManager {
    pub fn new(logger: Logger, validation: Validation, api: Arc<dyn ApiTransport>) -> Self {
        Self {
            logger: logger.child("devices"),
            validation,
            api,
        }
    }

    pub async fn list_devices(&self, args: &Value) -> Result<Value, ToolError> {
        let args: ListDevicesArgs = self.validation.parse_args("list_devices", args)?;
        let limit = self.validation.sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?;

        let mut query = self.validation.build_filter_params(args.filter.as_ref());
        query.extend(self.validation.build_field_params(args.fields.as_ref()));
        query.insert("limit".to_string(), limit.to_string());
        if let Some(sort) = args.sort.filter(|v| !v.is_empty()) {
            query.insert("sort".to_string(), sort);
        }
        self.logger.debug(
            "Listing devices",
            Some(&serde_json::json!({ "params": query.len() })),
        );
        self.api.get("/devices", query).await
    }
}

#[async_trait]
impl ToolHandler for DevicesManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        match tool {
            "list_devices" => self.list_devices(&args).await.map(ToolOutput::Json),
            _ => Err(unknown_tool_error("devices", tool, DEVICE_TOOLS)),
        }
    }
}
