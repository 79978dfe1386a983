use crate::constants::limits::MAX_LIMIT;
use crate::errors::ToolError;
use crate::services::appstore_client::{ApiTransport, QueryParams};
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolHandler, ToolOutput};
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_tool_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const APP_TOOLS: &[&str] = &["list_apps", "get_app_info"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAppsArgs {
    #[serde(default)]
    limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetAppInfoArgs {
    app_id: String,
    #[serde(default)]
    include: Option<Value>,
    #[serde(default)]
    fields: Option<Value>,
}

#[derive(Clone)]
pub struct AppsManager {
    logger: Logger,
    validation: Validation,
    api: Arc<dyn ApiTransport>,
}

impl AppsManager {
    pub fn new(logger: Logger, validation: Validation, api: Arc<dyn ApiTransport>) -> Self {
        Self {
            logger: logger.child("apps"),
            validation,
            api,
        }
    }

    pub async fn list_apps(&self, args: &Value) -> Result<Value, ToolError> {
        let args: ListAppsArgs = self.validation.parse_args("list_apps", args)?;
        let limit = self.validation.sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?;

        let mut query = QueryParams::new();
        query.insert("limit".to_string(), limit.to_string());
        self.api.get("/apps", query).await
    }

    pub async fn get_app_info(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation.validate_required(args, &["appId"])?;
        let args: GetAppInfoArgs = self.validation.parse_args("get_app_info", args)?;

        let mut query = self.validation.build_field_params(args.fields.as_ref());
        if let Some(include) = self.validation.build_include_param(args.include.as_ref()) {
            query.insert("include".to_string(), include);
        }
        self.api.get(&format!("/apps/{}", args.app_id), query).await
    }

    /// Looks up the app whose bundle identifier matches exactly. `Ok(None)`
    /// when the account has no such app.
    pub async fn find_app_by_bundle_id(&self, bundle_id: &str) -> Result<Option<String>, ToolError> {
        let mut query = QueryParams::new();
        query.insert("filter[bundleId]".to_string(), bundle_id.to_string());
        query.insert("limit".to_string(), "1".to_string());

        let response = self.api.get("/apps", query).await?;
        let app_id = response
            .get("data")
            .and_then(|v| v.as_array())
            .and_then(|items| items.first())
            .and_then(|app| app.get("id"))
            .and_then(|id| id.as_str())
            .map(|id| id.to_string());
        self.logger.debug(
            "Resolved bundle identifier",
            Some(&serde_json::json!({ "bundle_id": bundle_id, "app_id": app_id })),
        );
        Ok(app_id)
    }
}

#[async_trait]
impl ToolHandler for AppsManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let value = match tool {
            "list_apps" => self.list_apps(&args).await?,
            "get_app_info" => self.get_app_info(&args).await?,
            _ => return Err(unknown_tool_error("apps", tool, APP_TOOLS)),
        };
        Ok(ToolOutput::Json(value))
    }
}
