use super::models::{HealthCheck, UIConfiguration};
use crate::config::{Config, StorageBackend};
use crate::config::test_helpers::{extract_response_body, get_request, setup_test_app, setup_test_app_with};
use axum::http::StatusCode;
use tower::ServiceExt;

#[test]
fn test_ui_configuration_serialization() {
    let config = UIConfiguration {
        app_name: "inspections".to_string(),
        deployment: "test".to_string(),
        auth_enabled: true,
        storage_backend: StorageBackend::S3,
        max_upload_bytes: 1024,
    };

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["appName"], "inspections");
    assert_eq!(json["deployment"], "test");
    assert_eq!(json["authEnabled"], true);
    assert_eq!(json["storageBackend"], "s3");
    assert_eq!(json["maxUploadBytes"], 1024);
}

#[test]
fn test_health_check_deserialization() {
    let health: HealthCheck =
        serde_json::from_str(r#"{"status":"ok","database":"ok","storageBackend":"local"}"#).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.storage_backend, StorageBackend::Local);
}

#[tokio::test]
async fn test_healthz_pings_database() {
    let app = setup_test_app().await;

    let response = app.router.oneshot(get_request("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_response_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["storageBackend"], "local");
}

#[tokio::test]
async fn test_healthz_reports_unreachable_database() {
    let app = setup_test_app().await;
    app.state.db.clone().close().await.unwrap();

    let response = app.router.oneshot(get_request("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = extract_response_body(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["database"], "unreachable");
}

#[tokio::test]
async fn test_config_endpoint_reports_deployment() {
    let app = setup_test_app().await;

    let response = app.router.oneshot(get_request("/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_response_body(response).await;
    assert_eq!(body["appName"], "mushroom-inspection-api-test");
    assert_eq!(body["deployment"], "test");
    assert_eq!(body["authEnabled"], false);
    assert_eq!(body["storageBackend"], "local");
    assert_eq!(body["maxUploadBytes"], app.state.config.max_upload_bytes);
}

#[tokio::test]
async fn test_protected_routes_require_token_when_auth_enabled() {
    let mut config = Config::for_tests();
    config.auth_enabled = true;
    let app = setup_test_app_with(config).await;

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/inspections"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = extract_response_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Config stays public so the UI can discover the deployment
    let response = app.router.oneshot(get_request("/api/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
