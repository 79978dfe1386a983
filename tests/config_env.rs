mod common;
use common::ENV_LOCK;

use appstore_connect_mcp::config::AppConfig;
use appstore_connect_mcp::constants::{api, env};
use appstore_connect_mcp::errors::ToolErrorKind;
use pretty_assertions::assert_eq;

const VARS: &[&str] = &[
    env::KEY_ID,
    env::ISSUER_ID,
    env::P8_PATH,
    env::VENDOR_NUMBER,
    env::API_BASE_URL,
];

fn snapshot() -> Vec<(&'static str, Option<String>)> {
    VARS.iter().map(|key| (*key, std::env::var(key).ok())).collect()
}

fn restore_env(previous: Vec<(&'static str, Option<String>)>) {
    for (key, value) in previous {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

#[tokio::test]
async fn from_env_reads_trimmed_values_and_base_url_override() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();

    std::env::set_var(env::KEY_ID, " 2X9R4HXF34 ");
    std::env::set_var(env::ISSUER_ID, "57246542-96fe-1a63-e053-0824d011072a");
    std::env::set_var(env::P8_PATH, "/keys/AuthKey_2X9R4HXF34.p8");
    std::env::set_var(env::VENDOR_NUMBER, "85000000");
    std::env::set_var(env::API_BASE_URL, "http://127.0.0.1:8080/v1/");

    let config = AppConfig::from_env();
    restore_env(previous);

    assert_eq!(config.key_id, "2X9R4HXF34");
    assert_eq!(config.private_key_path, "/keys/AuthKey_2X9R4HXF34.p8");
    assert_eq!(config.vendor_number.as_deref(), Some("85000000"));
    assert_eq!(config.api_base_url, "http://127.0.0.1:8080/v1");
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn from_env_without_credentials_fails_validation() {
    let _guard = ENV_LOCK.lock().await;
    let previous = snapshot();

    for key in VARS {
        std::env::remove_var(key);
    }
    std::env::set_var(env::VENDOR_NUMBER, "   ");

    let config = AppConfig::from_env();
    restore_env(previous);

    assert!(!config.has_vendor_number());
    assert_eq!(config.api_base_url, api::DEFAULT_BASE_URL);
    let err = config.validate().unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::Configuration);
    assert_eq!(
        err.details.expect("details")["missing"],
        serde_json::json!([env::KEY_ID, env::ISSUER_ID, env::P8_PATH])
    );
}
