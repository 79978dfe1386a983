//! Process configuration, read once from the environment at startup.

use crate::constants::{api, env};
use crate::errors::ToolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub key_id: String,
    pub issuer_id: String,
    pub private_key_path: String,
    pub vendor_number: Option<String>,
    pub api_base_url: String,
}

impl AppConfig {
    pub fn new(
        key_id: impl Into<String>,
        issuer_id: impl Into<String>,
        private_key_path: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            issuer_id: issuer_id.into(),
            private_key_path: private_key_path.into(),
            vendor_number: None,
            api_base_url: api::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_vendor_number(mut self, vendor_number: impl Into<String>) -> Self {
        self.vendor_number = Some(vendor_number.into()).filter(|v: &String| !v.trim().is_empty());
        self
    }

    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Reads the `APP_STORE_CONNECT_*` variables. Absent values come back
    /// empty; [`AppConfig::validate`] decides whether that is fatal.
    pub fn from_env() -> Self {
        let base_url = read_env(env::API_BASE_URL)
            .unwrap_or_else(|| api::DEFAULT_BASE_URL.to_string());
        Self {
            key_id: read_env(env::KEY_ID).unwrap_or_default(),
            issuer_id: read_env(env::ISSUER_ID).unwrap_or_default(),
            private_key_path: read_env(env::P8_PATH).unwrap_or_default(),
            vendor_number: read_env(env::VENDOR_NUMBER),
            api_base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        let missing: Vec<&str> = [
            (env::KEY_ID, &self.key_id),
            (env::ISSUER_ID, &self.issuer_id),
            (env::P8_PATH, &self.private_key_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(ToolError::configuration(format!(
            "Missing required environment variables. Please set: {}, {}, {}",
            env::KEY_ID,
            env::ISSUER_ID,
            env::P8_PATH
        ))
        .with_details(serde_json::json!({ "missing": missing })))
    }

    pub fn has_vendor_number(&self) -> bool {
        self.vendor_number.is_some()
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolErrorKind;

    #[test]
    fn validate_reports_every_missing_variable() {
        let config = AppConfig::new("", "issuer", " ");
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Configuration);
        assert_eq!(
            err.details.unwrap()["missing"],
            serde_json::json!([env::KEY_ID, env::P8_PATH])
        );
    }

    #[test]
    fn blank_vendor_number_is_treated_as_absent() {
        let config = AppConfig::new("k", "i", "/tmp/key.p8").with_vendor_number("  ");
        assert!(!config.has_vendor_number());
        let config = config.with_vendor_number("8812345");
        assert_eq!(config.vendor_number.as_deref(), Some("8812345"));
    }
}
