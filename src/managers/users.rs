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

pub const USER_TOOLS: &[&str] = &["list_users"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListUsersArgs {
    limit: Option<Value>,
    sort: Option<String>,
    filter: Option<Value>,
    include: Option<Value>,
}

/// Team members of the App Store Connect account.
#[derive(Clone)]
pub struct UsersManager {
    validation: Validation,
    api: Arc<dyn ApiTransport>,
}

impl UsersManager {
    pub fn new(validation: Validation, api: Arc<dyn ApiTransport>) -> Self {
        Self { validation, api }
    }

    pub async fn list_users(&self, args: &Value) -> Result<Value, ToolError> {
        let args: ListUsersArgs = self.validation.parse_args("list_users", args)?;
        let limit = self.validation.sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?;

        let mut query = self.validation.build_filter_params(args.filter.as_ref());
        query.insert("limit".to_string(), limit.to_string());
        if let Some(sort) = args.sort.filter(|v| !v.is_empty()) {
            query.insert("sort".to_string(), sort);
        }
        if let Some(include) = self.validation.build_include_param(args.include.as_ref()) {
            query.insert("include".to_string(), include);
        }
        self.api.get("/users", query).await
    }
}

#[async_trait]
impl ToolHandler for UsersManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        match tool {
            "list_users" => self.list_users(&args).await.map(ToolOutput::Json),
            _ => Err(unknown_tool_error("users", tool, USER_TOOLS)),
        }
    }
}
