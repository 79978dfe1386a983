mod common;
use common::{serve_once, test_config};

use appstore_connect_mcp::errors::ToolErrorKind;
use appstore_connect_mcp::mcp::server::map_tool_error;
use appstore_connect_mcp::services::appstore_client::{ApiTransport, AppStoreClient, QueryParams};
use appstore_connect_mcp::services::credentials::CredentialMinter;
use appstore_connect_mcp::services::logger::Logger;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn client(base_url: &str) -> AppStoreClient {
    let config = test_config(base_url);
    let logger = Logger::new("test");
    let minter = Arc::new(CredentialMinter::new(logger.clone(), &config).expect("config"));
    AppStoreClient::new(logger, &config, minter).expect("client")
}

#[tokio::test]
async fn get_sends_bearer_token_and_query_under_versioned_base() {
    let (base, server) = serve_once(200, "application/json", br#"{"data":[{"id":"1"}]}"#.to_vec()).await;
    let api = client(&format!("{}/v1", base));

    let mut query = QueryParams::new();
    query.insert("limit".to_string(), "5".to_string());
    query.insert("filter[platform]".to_string(), "IOS".to_string());
    let response = api.get("/bundleIds", query).await.expect("response");
    assert_eq!(response, json!({"data": [{"id": "1"}]}));

    let captured = server.await.expect("server");
    assert_eq!(
        captured.request_line,
        "GET /v1/bundleIds?filter%5Bplatform%5D=IOS&limit=5 HTTP/1.1"
    );
    let auth = captured.header("authorization").expect("authorization header");
    assert!(auth.starts_with("Bearer ey"), "unexpected header: {}", auth);
    assert_eq!(captured.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn post_serializes_json_body() {
    let (base, server) = serve_once(201, "application/json", br#"{"data":{"id":"cap-1"}}"#.to_vec()).await;
    let api = client(&base);

    let body = json!({"data": {"type": "bundleIdCapabilities", "attributes": {"capabilityType": "ICLOUD"}}});
    let response = api.post("/bundleIdCapabilities", body.clone()).await.expect("response");
    assert_eq!(response["data"]["id"], "cap-1");

    let captured = server.await.expect("server");
    assert!(captured.request_line.starts_with("POST /bundleIdCapabilities "));
    let sent: Value = serde_json::from_str(&captured.body).expect("json body");
    assert_eq!(sent, body);
}

#[tokio::test]
async fn empty_success_body_decodes_to_null() {
    let (base, server) = serve_once(200, "application/json", Vec::new()).await;
    let api = client(&base);

    let response = api
        .delete("/bundleIdCapabilities/cap-1", None)
        .await
        .expect("response");
    assert_eq!(response, Value::Null);
    assert!(server.await.expect("server").request_line.starts_with("DELETE "));
}

#[tokio::test]
async fn structured_error_detail_becomes_remote_api_error() {
    let body = br#"{"errors":[{"status":"409","code":"ENTITY_ERROR","detail":"An App ID with Identifier 'com.example.app' is not available."}]}"#;
    let (base, server) = serve_once(409, "application/json", body.to_vec()).await;
    let api = client(&base);

    let err = api.get("/bundleIds", QueryParams::new()).await.unwrap_err();
    server.await.expect("server");
    assert_eq!(err.kind, ToolErrorKind::RemoteApi);
    assert_eq!(err.status, Some(409));
    assert_eq!(
        map_tool_error(&err).message,
        "App Store Connect API error: An App ID with Identifier 'com.example.app' is not available."
    );
}

#[tokio::test]
async fn unstructured_error_falls_back_to_status_line() {
    let (base, server) = serve_once(503, "text/html", b"<html>down</html>".to_vec()).await;
    let api = client(&base);

    let err = api.get("/apps", QueryParams::new()).await.unwrap_err();
    server.await.expect("server");
    assert_eq!(err.message, "Request failed with status code 503");
    assert!(err.retryable);
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let api = client("http://127.0.0.1:1/v1");
    let err = api.get("/apps", QueryParams::new()).await.unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::Transport);
    assert!(map_tool_error(&err)
        .message
        .starts_with("App Store Connect API error: "));
}

#[tokio::test]
async fn download_returns_raw_bytes_with_content_type() {
    let (base, server) = serve_once(200, "text/csv", b"Date,Units\n2024-01-01,3\n".to_vec()).await;
    let api = client(&base);

    let download = api
        .download_from_url(&format!("{}/segments/1.csv", base))
        .await
        .expect("download");
    server.await.expect("server");
    assert_eq!(download.content_type.as_deref(), Some("text/csv"));
    assert_eq!(download.size, 24);
    let value = download.to_value();
    assert_eq!(value["encoding"], "utf8");
    assert_eq!(value["data"], "Date,Units\n2024-01-01,3\n");
}
