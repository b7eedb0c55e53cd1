use crate::config::Config;
use crate::config::test_helpers::{
    create_test_user, extract_response_body, get_request, json_request, setup_test_app,
    setup_test_app_with,
};
use crate::users::models::Role;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

fn bearer_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn bearer_post(uri: &str, token: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn obtain(app: &axum::Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token",
            &json!({"username": username, "password": password}),
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, extract_response_body(response).await)
}

#[tokio::test]
async fn test_obtain_token() {
    let app = setup_test_app().await;
    let user = create_test_user(&app.state.db, "ivan", "s3cret", Role::Inspector).await;

    let (status, body) = obtain(&app.router, "ivan", "s3cret").await;
    assert_eq!(status, StatusCode::OK, "{body:?}");
    assert_eq!(body["user_id"], user.id.to_string());
    assert_eq!(body["role"], "inspector");
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_obtain_token_failures() {
    let app = setup_test_app().await;
    create_test_user(&app.state.db, "ivan", "s3cret", Role::Inspector).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/token", &json!({"username": "ivan"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = obtain(&app.router, "nobody", "s3cret").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = obtain(&app.router, "ivan", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_refresh_and_check_token() {
    let app = setup_test_app().await;
    let user = create_test_user(&app.state.db, "ivan", "s3cret", Role::Manager).await;
    let (_, tokens) = obtain(&app.router, "ivan", "s3cret").await;
    let refresh = tokens["refresh_token"].as_str().unwrap();
    let access = tokens["access_token"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token/refresh",
            &json!({"refresh_token": refresh}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_response_body(response).await;
    let renewed = body["access_token"].as_str().unwrap().to_string();

    // An access token is not accepted as a refresh token
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token/refresh",
            &json!({"refresh_token": access}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(bearer_get("/api/token/check", &renewed))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_response_body(response).await;
    assert_eq!(body["token_valid"], true);
    assert_eq!(body["user_id"], user.id.to_string());

    let response = app
        .router
        .oneshot(bearer_get("/api/token/check", "garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_response_body(response).await;
    assert_eq!(body["token_valid"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_and_list_users() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users",
            &json!({"username": "olga", "password": "pw", "first_name": "Ольга", "last_name": "Иванова"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_response_body(response).await;
    assert_eq!(body["role"], "inspector");
    assert_eq!(body["full_name"], "Иванова Ольга");
    assert!(body.get("password_hash").is_none());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users",
            &json!({"username": "olga", "password": "other"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.router.oneshot(get_request("/api/users")).await.unwrap();
    let body = extract_response_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_only_admins_create_users_when_auth_enabled() {
    let mut config = Config::for_tests();
    config.auth_enabled = true;
    let app = setup_test_app_with(config).await;
    create_test_user(&app.state.db, "admin", "admin-pw", Role::Admin).await;
    create_test_user(&app.state.db, "ivan", "s3cret", Role::Inspector).await;

    let (_, inspector) = obtain(&app.router, "ivan", "s3cret").await;
    let (_, admin) = obtain(&app.router, "admin", "admin-pw").await;
    let new_user = json!({"username": "new", "password": "pw"});

    let response = app
        .router
        .clone()
        .oneshot(bearer_post(
            "/api/users",
            inspector["access_token"].as_str().unwrap(),
            &new_user,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .clone()
        .oneshot(bearer_post(
            "/api/users",
            admin["access_token"].as_str().unwrap(),
            &new_user,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // The token endpoint stays public
    let (status, _) = obtain(&app.router, "new", "pw").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_ensure_admin_only_on_empty_table() {
    let mut config = Config::for_tests();
    config.admin_username = Some("root".to_string());
    config.admin_password = Some("root-pw".to_string());
    let app = setup_test_app_with(config.clone()).await;

    let created = crate::users::services::ensure_admin(&app.state.db, &config)
        .await
        .unwrap()
        .expect("admin should be created");
    assert_eq!(created.role, Role::Admin);

    let again = crate::users::services::ensure_admin(&app.state.db, &config)
        .await
        .unwrap();
    assert!(again.is_none());
}
