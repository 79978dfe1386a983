use crate::constants::env;
use crate::constants::limits::MAX_LIMIT;
use crate::errors::ToolError;
use crate::services::appstore_client::{ApiTransport, QueryParams};
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolHandler, ToolOutput};
use crate::services::validation::Validation;
use crate::utils::redact::redact_text;
use crate::utils::tool_errors::unknown_tool_error;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const ANALYTICS_TOOLS: &[&str] = &[
    "create_analytics_report_request",
    "list_analytics_reports",
    "list_analytics_report_segments",
    "download_analytics_report_segment",
    "download_sales_report",
    "download_finance_report",
];

/// Tools that need a vendor number and are hidden from listings without one.
pub const PAYMENT_TOOLS: &[&str] = &["download_sales_report", "download_finance_report"];

const ACCESS_TYPES: &[&str] = &["ONGOING", "ONE_TIME_SNAPSHOT"];
const SALES_REPORT_TYPES: &[&str] = &["SALES"];
const SALES_REPORT_SUB_TYPES: &[&str] = &["SUMMARY", "DETAILED"];
const SALES_FREQUENCIES: &[&str] = &["DAILY", "WEEKLY", "MONTHLY", "YEARLY"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateReportRequestArgs {
    app_id: String,
    #[serde(default)]
    access_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListReportsArgs {
    report_request_id: String,
    #[serde(default)]
    limit: Option<Value>,
    #[serde(default)]
    filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSegmentsArgs {
    report_id: String,
    #[serde(default)]
    limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadSegmentArgs {
    segment_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SalesReportArgs {
    vendor_number: Option<String>,
    report_type: Option<String>,
    report_sub_type: Option<String>,
    frequency: Option<String>,
    report_date: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinanceReportArgs {
    vendor_number: Option<String>,
    report_date: Option<String>,
    region_code: Option<String>,
}

/// Analytics report requests plus the vendor-scoped sales and finance
/// downloads.
#[derive(Clone)]
pub struct AnalyticsManager {
    logger: Logger,
    validation: Validation,
    api: Arc<dyn ApiTransport>,
    vendor_number: Option<String>,
}

impl AnalyticsManager {
    pub fn new(
        logger: Logger,
        validation: Validation,
        api: Arc<dyn ApiTransport>,
        vendor_number: Option<String>,
    ) -> Self {
        Self {
            logger: logger.child("analytics"),
            validation,
            api,
            vendor_number: vendor_number.filter(|v| !v.trim().is_empty()),
        }
    }

    pub async fn create_analytics_report_request(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation.validate_required(args, &["appId"])?;
        let args: CreateReportRequestArgs = self
            .validation
            .parse_args("create_analytics_report_request", args)?;
        let access_type = self
            .validation
            .validate_enum(args.access_type.as_deref(), ACCESS_TYPES, "accessType")?
            .unwrap_or_else(|| "ONE_TIME_SNAPSHOT".to_string());

        let body = json!({
            "data": {
                "type": "analyticsReportRequests",
                "attributes": { "accessType": access_type },
                "relationships": {
                    "app": { "data": { "id": args.app_id, "type": "apps" } }
                }
            }
        });
        self.api.post("/analyticsReportRequests", body).await
    }

    pub async fn list_analytics_reports(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation
            .validate_required(args, &["reportRequestId"])?;
        let args: ListReportsArgs = self.validation.parse_args("list_analytics_reports", args)?;
        let limit = self.validation.sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?;

        let mut query = self.validation.build_filter_params(args.filter.as_ref());
        query.insert("limit".to_string(), limit.to_string());
        self.api
            .get(
                &format!("/analyticsReportRequests/{}/reports", args.report_request_id),
                query,
            )
            .await
    }

    pub async fn list_analytics_report_segments(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation.validate_required(args, &["reportId"])?;
        let args: ListSegmentsArgs = self
            .validation
            .parse_args("list_analytics_report_segments", args)?;
        let limit = self.validation.sanitize_limit(args.limit.as_ref(), MAX_LIMIT)?;

        let mut query = QueryParams::new();
        query.insert("limit".to_string(), limit.to_string());
        self.api
            .get(&format!("/analyticsReports/{}/segments", args.report_id), query)
            .await
    }

    /// Segment URLs are pre-signed. The body is returned untouched in the
    /// download envelope, whatever it looks like.
    pub async fn download_analytics_report_segment(&self, args: &Value) -> Result<Value, ToolError> {
        self.validation.validate_required(args, &["segmentUrl"])?;
        let args: DownloadSegmentArgs = self
            .validation
            .parse_args("download_analytics_report_segment", args)?;

        self.logger.debug(
            "Downloading analytics segment",
            Some(&json!({ "url": redact_text(&args.segment_url, 120) })),
        );
        let download = self.api.download_from_url(&args.segment_url).await?;
        Ok(download.to_value())
    }

    pub async fn download_sales_report(&self, args: &Value) -> Result<Value, ToolError> {
        let args: SalesReportArgs = self.validation.parse_args("download_sales_report", args)?;
        let vendor_number = self.vendor_number(args.vendor_number)?;
        self.validation
            .validate_required(&json!({ "reportDate": args.report_date }), &["reportDate"])?;

        let report_type = self
            .validation
            .validate_enum(args.report_type.as_deref(), SALES_REPORT_TYPES, "reportType")?
            .unwrap_or_else(|| "SALES".to_string());
        let report_sub_type = self
            .validation
            .validate_enum(
                args.report_sub_type.as_deref(),
                SALES_REPORT_SUB_TYPES,
                "reportSubType",
            )?
            .unwrap_or_else(|| "SUMMARY".to_string());
        let frequency = self
            .validation
            .validate_enum(args.frequency.as_deref(), SALES_FREQUENCIES, "frequency")?
            .unwrap_or_else(|| "MONTHLY".to_string());

        let filters = json!({
            "reportDate": args.report_date,
            "reportType": report_type,
            "reportSubType": report_sub_type,
            "frequency": frequency,
            "vendorNumber": vendor_number,
            "version": args.version.filter(|v| !v.is_empty()),
        });
        self.api
            .get("/salesReports", self.validation.build_filter_params(Some(&filters)))
            .await
    }

    pub async fn download_finance_report(&self, args: &Value) -> Result<Value, ToolError> {
        let args: FinanceReportArgs = self.validation.parse_args("download_finance_report", args)?;
        let vendor_number = self.vendor_number(args.vendor_number)?;
        let filters = json!({
            "reportDate": args.report_date,
            "regionCode": args.region_code,
            "vendorNumber": vendor_number,
        });
        self.validation
            .validate_required(&filters, &["reportDate", "regionCode"])?;

        self.api
            .get("/financeReports", self.validation.build_filter_params(Some(&filters)))
            .await
    }

    /// The argument wins over the configured value.
    fn vendor_number(&self, from_args: Option<String>) -> Result<String, ToolError> {
        from_args
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.vendor_number.clone())
            .ok_or_else(|| {
                ToolError::configuration(format!(
                    "Vendor number is required. Please provide it as an argument or set {} environment variable.",
                    env::VENDOR_NUMBER
                ))
            })
    }
}

#[async_trait]
impl ToolHandler for AnalyticsManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let value = match tool {
            "create_analytics_report_request" => self.create_analytics_report_request(&args).await?,
            "list_analytics_reports" => self.list_analytics_reports(&args).await?,
            "list_analytics_report_segments" => self.list_analytics_report_segments(&args).await?,
            "download_analytics_report_segment" => {
                self.download_analytics_report_segment(&args).await?
            }
            "download_sales_report" => self.download_sales_report(&args).await?,
            "download_finance_report" => self.download_finance_report(&args).await?,
            _ => return Err(unknown_tool_error("analytics", tool, ANALYTICS_TOOLS)),
        };
        Ok(ToolOutput::Json(value))
    }
}
