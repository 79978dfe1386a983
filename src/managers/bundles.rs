use crate::constants::limits::MAX_LIMIT;
use crate::errors::ToolError;
use crate::services::appstore_client::ApiTransport;
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolHandler, ToolOutput};
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_tool_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const BUNDLE_TOOLS: &[&str] = &[
    "create_bundle_id",
    "list_bundle_ids",
    "get_bundle_id_info",
    "enable_bundle_capability",
    "disable_bundle_capability",
];

const BUNDLE_PLATFORMS: &[&str] = &["IOS", "MAC_OS", "UNIVERSAL"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBundleIdArgs {
    identifier: String,
    name: String,
    platform: String,
    #[serde(default)]
    seed_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBundleIdsArgs {
    limit: Option<Value>,
    sort: Option<String>,
    filter: Option<Value>,
    include: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleIdInfoArgs {
    bundle_id_id: String,
    #[serde(default)]
    fields: Option<Value>,
    #[serde(default)]
    include: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnableCapabilityArgs {
    bundle_id_id: String,
    capability_type: String,
    #[serde(default)]
    settings: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisableCapabilityArgs {
    capability_id: String,
}

#[derive(Clone)]
pub struct BundlesManager {
    logger: Logger,
    validation: Validation,
    api: Arc<dyn ApiTransport>,
}

impl BundlesManager {
    pub fn new(logger: Logger, validation: Validation, api: Arc<dyn ApiTransport>) -> Self {
        Self {
            logger: logger.child("bundles"),
            validation,
            api,
        }
    }

    pub async fn create_bundle_id(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation
            .validate_required(args, &["identifier", "name", "platform"])?;
        let args: CreateBundleIdArgs = self.validation.parse_args("create_bundle_id", args)?;
        self.validation
            .validate_enum(Some(&args.platform), BUNDLE_PLATFORMS, "platform")?;

        let mut attributes = Map::new();
        attributes.insert("identifier".to_string(), json!(args.identifier));
        attributes.insert("name".to_string(), json!(args.name));
        attributes.insert("platform".to_string(), json!(args.platform));
        if let Some(seed_id) = args.seed_id.filter(|v| !v.is_empty()) {
            attributes.insert("seedId".to_string(), json!(seed_id));
        }

        let body = json!({
            "data": {
                "type": "bundleIds",
                "attributes": attributes,
            }
        });
        self.api.post("/bundleIds", body).await
    }

    pub async fn list_bundle_ids(&self, args: &Value) -> Result<Value, ToolError> {
        let args: ListBundleIdsArgs = self.validation.parse_args("list_bundle_ids", args)?;
        let limit = self.validation.sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?;

        let mut query = self.validation.build_filter_params(args.filter.as_ref());
        query.insert("limit".to_string(), limit.to_string());
        if let Some(sort) = args.sort.filter(|v| !v.is_empty()) {
            query.insert("sort".to_string(), sort);
        }
        if let Some(include) = self.validation.build_include_param(args.include.as_ref()) {
            query.insert("include".to_string(), include);
        }
        self.api.get("/bundleIds", query).await
    }

    pub async fn get_bundle_id_info(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation.validate_required(args, &["bundleIdId"])?;
        let args: BundleIdInfoArgs = self.validation.parse_args("get_bundle_id_info", args)?;

        let mut query = self.validation.build_field_params(args.fields.as_ref());
        if let Some(include) = self.validation.build_include_param(args.include.as_ref()) {
            query.insert("include".to_string(), include);
        }
        self.api
            .get(&format!("/bundleIds/{}", args.bundle_id_id), query)
            .await
    }

    pub async fn enable_bundle_capability(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation
            .validate_required(args, &["bundleIdId", "capabilityType"])?;
        let args: EnableCapabilityArgs = self
            .validation
            .parse_args("enable_bundle_capability", args)?;

        let mut attributes = Map::new();
        attributes.insert("capabilityType".to_string(), json!(args.capability_type));
        if let Some(settings) = args.settings.filter(|v| !v.is_null()) {
            attributes.insert("settings".to_string(), settings);
        }

        let body = json!({
            "data": {
                "type": "bundleIdCapabilities",
                "attributes": attributes,
                "relationships": {
                    "bundleId": {
                        "data": { "id": args.bundle_id_id, "type": "bundleIds" }
                    }
                }
            }
        });
        self.api.post("/bundleIdCapabilities", body).await
    }

    pub async fn disable_bundle_capability(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation.validate_required(args, &["capabilityId"])?;
        let args: DisableCapabilityArgs = self
            .validation
            .parse_args("disable_bundle_capability", args)?;

        self.api
            .delete(&format!("/bundleIdCapabilities/{}", args.capability_id), None)
            .await?;
        self.logger.info(
            "Capability disabled",
            Some(&json!({ "capability_id": args.capability_id })),
        );
        Ok(json!({
            "success": true,
            "message": "Capability disabled successfully"
        }))
    }
}

#[async_trait]
impl ToolHandler for BundlesManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let value = match tool {
            "create_bundle_id" => self.create_bundle_id(&args).await?,
            "list_bundle_ids" => self.list_bundle_ids(&args).await?,
            "get_bundle_id_info" => self.get_bundle_id_info(&args).await?,
            "enable_bundle_capability" => self.enable_bundle_capability(&args).await?,
            "disable_bundle_capability" => self.disable_bundle_capability(&args).await?,
            _ => return Err(unknown_tool_error("bundles", tool, BUNDLE_TOOLS)),
        };
        Ok(ToolOutput::Json(value))
    }
}
