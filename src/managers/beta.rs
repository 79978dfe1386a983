use crate::constants::limits::{FEEDBACK_DEFAULT_LIMIT, MAX_LIMIT};
use crate::errors::ToolError;
use crate::managers::apps::AppsManager;
use crate::services::appstore_client::{ApiTransport, QueryParams};
use crate::services::logger::Logger;
use crate::services::screenshot::{screenshot_url, ScreenshotFetcher, ScreenshotOutcome};
use crate::services::tool_executor::{ToolHandler, ToolOutput};
use crate::services::validation::Validation;
use crate::utils::tool_errors::unknown_tool_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const BETA_TOOLS: &[&str] = &[
    "list_beta_groups",
    "list_group_testers",
    "add_tester_to_group",
    "remove_tester_from_group",
    "list_beta_feedback_screenshots",
    "get_beta_feedback_screenshot",
];

const FEEDBACK_PLATFORMS: &[&str] = &["IOS", "MAC_OS", "TV_OS", "VISION_OS"];
const FEEDBACK_SORTS: &[&str] = &["createdDate", "-createdDate"];
const FEEDBACK_DEFAULT_SORT: &str = "-createdDate";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageArgs {
    #[serde(default)]
    limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupTestersArgs {
    group_id: String,
    #[serde(default)]
    limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTesterArgs {
    group_id: String,
    email: String,
    first_name: String,
    last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveTesterArgs {
    group_id: String,
    tester_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFeedbackArgs {
    app_id: Option<String>,
    bundle_id: Option<String>,
    build_id: Option<String>,
    device_platform: Option<String>,
    app_platform: Option<String>,
    device_model: Option<String>,
    os_version: Option<String>,
    tester_id: Option<String>,
    limit: Option<Value>,
    sort: Option<String>,
    include_builds: Option<bool>,
    include_testers: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetFeedbackArgs {
    feedback_id: String,
    #[serde(default)]
    include_builds: Option<bool>,
    #[serde(default)]
    include_testers: Option<bool>,
    #[serde(default)]
    download_screenshot: Option<bool>,
}

/// TestFlight groups, testers and tester feedback.
#[derive(Clone)]
pub struct BetaManager {
    logger: Logger,
    validation: Validation,
    api: Arc<dyn ApiTransport>,
    apps: Arc<AppsManager>,
    screenshots: ScreenshotFetcher,
}

impl BetaManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        api: Arc<dyn ApiTransport>,
        apps: Arc<AppsManager>,
        screenshots: ScreenshotFetcher,
    ) -> Self {
        Self {
            logger: logger.child("beta"),
            validation,
            api,
            apps,
            screenshots,
        }
    }

    pub async fn list_beta_groups(&self, args: &Value) -> Result<Value, ToolError> {
        let args: PageArgs = self.validation.parse_args("list_beta_groups", args)?;
        let mut query = QueryParams::new();
        query.insert(
            "limit".to_string(),
            self.validation
                .sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?
                .to_string(),
        );
        query.insert("include".to_string(), "app,betaTesters".to_string());
        self.api.get("/betaGroups", query).await
    }

    pub async fn list_group_testers(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation.validate_required(args, &["groupId"])?;
        let args: GroupTestersArgs = self.validation.parse_args("list_group_testers", args)?;
        let mut query = QueryParams::new();
        query.insert(
            "limit".to_string(),
            self.validation
                .sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?
                .to_string(),
        );
        self.api
            .get(&format!("/betaGroups/{}/betaTesters", args.group_id), query)
            .await
    }

    pub async fn add_tester_to_group(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation
            .validate_required(args, &["groupId", "email", "firstName", "lastName"])?;
        let args: AddTesterArgs = self.validation.parse_args("add_tester_to_group", args)?;

        let body = json!({
            "data": {
                "type": "betaTesters",
                "attributes": {
                    "email": args.email,
                    "firstName": args.first_name,
                    "lastName": args.last_name,
                },
                "relationships": {
                    "betaGroups": {
                        "data": [{ "id": args.group_id, "type": "betaGroups" }]
                    }
                }
            }
        });
        self.api.post("/betaTesters", body).await
    }

    /// Detaches a tester from a group. The confirmation is fixed; the
    /// remote body (usually empty) is not inspected.
    pub async fn remove_tester_from_group(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation
            .validate_required(args, &["groupId", "testerId"])?;
        let args: RemoveTesterArgs = self
            .validation
            .parse_args("remove_tester_from_group", args)?;

        let body = json!({ "data": [{ "id": args.tester_id, "type": "betaTesters" }] });
        self.api
            .delete(
                &format!("/betaGroups/{}/relationships/betaTesters", args.group_id),
                Some(body),
            )
            .await?;
        Ok(json!({
            "success": true,
            "message": "Tester removed from group successfully"
        }))
    }

    /// Every argument is checked before the bundle id lookup goes out.
    pub async fn list_beta_feedback_screenshots(&self, args: &Value) -> Result<Value, ToolError> {
        let args: ListFeedbackArgs = self
            .validation
            .parse_args("list_beta_feedback_screenshots", args)?;
        let device_platform = self.validation.validate_enum(
            args.device_platform.as_deref(),
            FEEDBACK_PLATFORMS,
            "devicePlatform",
        )?;
        let app_platform = self.validation.validate_enum(
            args.app_platform.as_deref(),
            FEEDBACK_PLATFORMS,
            "appPlatform",
        )?;
        let sort = self
            .validation
            .validate_enum(args.sort.as_deref(), FEEDBACK_SORTS, "sort")?
            .unwrap_or_else(|| FEEDBACK_DEFAULT_SORT.to_string());
        let limit = match args.limit.as_ref() {
            None | Some(Value::Null) | Some(Value::Bool(false)) => FEEDBACK_DEFAULT_LIMIT,
            Some(Value::String(raw)) if raw.is_empty() => FEEDBACK_DEFAULT_LIMIT,
            Some(value) => self.validation.sanitize_limit(Some(value), MAX_LIMIT)?,
        };
        let app_id = self.resolve_app_id(args.app_id.as_deref(), args.bundle_id.as_deref()).await?;

        let filter = json!({
            "build": non_empty(args.build_id),
            "devicePlatform": device_platform,
            "appPlatform": app_platform,
            "deviceModel": non_empty(args.device_model),
            "osVersion": non_empty(args.os_version),
            "tester": non_empty(args.tester_id),
        });
        let mut query = self.validation.build_filter_params(Some(&filter));
        query.insert("limit".to_string(), limit.to_string());
        query.insert("sort".to_string(), sort);
        if let Some(include) = feedback_include(args.include_builds, args.include_testers) {
            query.insert("include".to_string(), include);
        }

        self.api
            .get(
                &format!("/apps/{}/betaFeedbackScreenshotSubmissions", app_id),
                query,
            )
            .await
    }

    /// Fetches one submission and, unless disabled, inlines its first
    /// screenshot. A failed image download never fails the call.
    pub async fn get_beta_feedback_screenshot(&self, args: &Value) -> Result<ToolOutput, ToolError> {
        self.validation.validate_required(args, &["feedbackId"])?;
        let args: GetFeedbackArgs = self
            .validation
            .parse_args("get_beta_feedback_screenshot", args)?;

        let mut query = QueryParams::new();
        if let Some(include) = feedback_include(args.include_builds, args.include_testers) {
            query.insert("include".to_string(), include);
        }
        let resource = self
            .api
            .get(
                &format!("/betaFeedbackScreenshotSubmissions/{}", args.feedback_id),
                query,
            )
            .await?;

        if !args.download_screenshot.unwrap_or(true) {
            return Ok(ToolOutput::Json(resource));
        }
        let Some(url) = screenshot_url(&resource) else {
            self.logger.debug(
                "Feedback has no screenshot URL",
                Some(&json!({ "feedback_id": args.feedback_id })),
            );
            return Ok(ToolOutput::Json(resource));
        };

        match self.screenshots.fetch_or_skip(&url).await {
            ScreenshotOutcome::Attached(image) => Ok(ToolOutput::WithImage { resource, image }),
            ScreenshotOutcome::Skipped(_) => Ok(ToolOutput::Json(resource)),
        }
    }

    async fn resolve_app_id(
        &self,
        app_id: Option<&str>,
        bundle_id: Option<&str>,
    ) -> Result<String, ToolError> {
        if let Some(app_id) = app_id.filter(|v| !v.is_empty()) {
            return Ok(app_id.to_string());
        }
        let Some(bundle_id) = bundle_id.filter(|v| !v.is_empty()) else {
            return Err(ToolError::missing_parameter(
                "Missing required parameters: appId or bundleId",
            )
            .with_details(json!({ "missing": ["appId", "bundleId"] })));
        };
        self.apps
            .find_app_by_bundle_id(bundle_id)
            .await?
            .ok_or_else(|| ToolError::not_found(format!("No app found with bundle ID: {}", bundle_id)))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn feedback_include(builds: Option<bool>, testers: Option<bool>) -> Option<String> {
    let mut parts = Vec::new();
    if builds.unwrap_or(false) {
        parts.push("build");
    }
    if testers.unwrap_or(false) {
        parts.push("tester");
    }
    (!parts.is_empty()).then(|| parts.join(","))
}

#[async_trait]
impl ToolHandler for BetaManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        match tool {
            "list_beta_groups" => self.list_beta_groups(&args).await.map(ToolOutput::Json),
            "list_group_testers" => self.list_group_testers(&args).await.map(ToolOutput::Json),
            "add_tester_to_group" => self.add_tester_to_group(&args).await.map(ToolOutput::Json),
            "remove_tester_from_group" => self
                .remove_tester_from_group(&args)
                .await
                .map(ToolOutput::Json),
            "list_beta_feedback_screenshots" => self
                .list_beta_feedback_screenshots(&args)
                .await
                .map(ToolOutput::Json),
            "get_beta_feedback_screenshot" => self.get_beta_feedback_screenshot(&args).await,
            _ => Err(unknown_tool_error("beta", tool, BETA_TOOLS)),
        }
    }
}
