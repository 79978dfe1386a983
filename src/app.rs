use crate::config::AppConfig;
use crate::errors::ToolError;
use crate::managers::analytics::{AnalyticsManager, ANALYTICS_TOOLS};
use crate::managers::apps::{AppsManager, APP_TOOLS};
use crate::managers::beta::{BetaManager, BETA_TOOLS};
use crate::managers::bundles::{BundlesManager, BUNDLE_TOOLS};
use crate::managers::devices::{DevicesManager, DEVICE_TOOLS};
use crate::managers::users::{UsersManager, USER_TOOLS};
use crate::mcp::catalog::tool_catalog;
use crate::services::appstore_client::{ApiTransport, AppStoreClient};
use crate::services::credentials::CredentialMinter;
use crate::services::logger::Logger;
use crate::services::screenshot::ScreenshotFetcher;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::validation::Validation;
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: AppConfig,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    fn validate_tool_wiring(handlers: &HashMap<String, Arc<dyn ToolHandler>>) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| !handlers.contains_key(&tool.name))
            .map(|tool| tool.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint("Every tool in tool_catalog.json must have a handler.")
            .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    /// Validates the configuration, then builds the live HTTP client.
    pub fn initialize(config: AppConfig) -> Result<Self, ToolError> {
        config.validate()?;
        let logger = Logger::new("asc");
        let credentials = Arc::new(CredentialMinter::new(logger.clone(), &config)?);
        let api: Arc<dyn ApiTransport> =
            Arc::new(AppStoreClient::new(logger.clone(), &config, credentials)?);
        let screenshots = ScreenshotFetcher::new(logger.clone())?;
        Self::with_transport(config, api, screenshots)
    }

    /// Wires every manager on top of an already-built transport.
    pub fn with_transport(
        config: AppConfig,
        api: Arc<dyn ApiTransport>,
        screenshots: ScreenshotFetcher,
    ) -> Result<Self, ToolError> {
        let logger = Logger::new("asc");
        let validation = Validation::new();

        let apps = Arc::new(AppsManager::new(
            logger.clone(),
            validation.clone(),
            api.clone(),
        ));
        let beta = Arc::new(BetaManager::new(
            logger.clone(),
            validation.clone(),
            api.clone(),
            apps.clone(),
            screenshots,
        ));
        let bundles = Arc::new(BundlesManager::new(
            logger.clone(),
            validation.clone(),
            api.clone(),
        ));
        let devices = Arc::new(DevicesManager::new(
            logger.clone(),
            validation.clone(),
            api.clone(),
        ));
        let users = Arc::new(UsersManager::new(validation.clone(), api.clone()));
        let analytics = Arc::new(AnalyticsManager::new(
            logger.clone(),
            validation,
            api,
            config.vendor_number.clone(),
        ));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        register(&mut handlers, APP_TOOLS, apps);
        register(&mut handlers, BETA_TOOLS, beta);
        register(&mut handlers, BUNDLE_TOOLS, bundles);
        register(&mut handlers, DEVICE_TOOLS, devices);
        register(&mut handlers, USER_TOOLS, users);
        register(&mut handlers, ANALYTICS_TOOLS, analytics);
        Self::validate_tool_wiring(&handlers)?;

        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));
        Ok(Self {
            logger,
            config,
            tool_executor,
        })
    }

    pub fn vendor_configured(&self) -> bool {
        self.config.has_vendor_number()
    }
}

fn register(
    handlers: &mut HashMap<String, Arc<dyn ToolHandler>>,
    tools: &[&str],
    handler: Arc<dyn ToolHandler>,
) {
    for tool in tools {
        handlers.insert(tool.to_string(), handler.clone());
    }
}
