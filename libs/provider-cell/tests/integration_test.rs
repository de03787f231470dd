use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};
use uuid::Uuid;

use provider_cell::router::provider_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockStoreResponses};

async fn create_test_app(config: AppConfig) -> Router {
    provider_routes(Arc::new(config))
}

fn test_config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ==============================================================================
// PUBLIC PROFILE
// ==============================================================================

#[tokio::test]
async fn test_get_public_provider() {
    let mock_server = MockServer::start().await;
    let config = test_config_for(&mock_server);
    let app = create_test_app(config).await;

    let provider_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .and(query_param("id", format!("eq.{}", provider_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::provider_response(&provider_id, "Jamie's Studio")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("provider_id", format!("eq.{}", provider_id)))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::service_response(&service_id, &provider_id, "Haircut", 45)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/public/{}", provider_id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["name"], json!("Jamie's Studio"));
    assert_eq!(json["services"].as_array().unwrap().len(), 1);
    assert_eq!(json["available"]["monday"]["start"], json!("09:00"));
}

#[tokio::test]
async fn test_blocked_provider_is_hidden() {
    let mock_server = MockServer::start().await;
    let config = test_config_for(&mock_server);
    let app = create_test_app(config).await;

    let provider_id = Uuid::new_v4().to_string();
    let mut provider = MockStoreResponses::provider_response(&provider_id, "Blocked Studio");
    provider["is_blocked"] = json!(true);

    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([provider])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/public/{}", provider_id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ==============================================================================
// WEEKLY TEMPLATE
// ==============================================================================

#[tokio::test]
async fn test_update_availability_success() {
    let mock_server = MockServer::start().await;

    let provider = TestUser::provider("prov@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&provider, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/providers"))
        .and(query_param("id", format!("eq.{}", provider.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::provider_response(&provider.id, "Test Provider")
        ])))
        .mount(&mock_server)
        .await;

    let body = json!({ "available": MockStoreResponses::weekday_template("08:00", "16:00") });

    let request = Request::builder()
        .method("PUT")
        .uri("/availability")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["success"], json!(true));
}

#[tokio::test]
async fn test_update_availability_rejects_inverted_range() {
    let mock_server = MockServer::start().await;

    let provider = TestUser::provider("prov@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&provider, &config.supabase_jwt_secret, Some(24));

    let body = json!({ "available": MockStoreResponses::weekday_template("17:00", "09:00") });

    let request = Request::builder()
        .method("PUT")
        .uri("/availability")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_availability_rejects_malformed_time() {
    let mock_server = MockServer::start().await;

    let provider = TestUser::provider("prov@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&provider, &config.supabase_jwt_secret, Some(24));

    // Malformed times never silently become midnight; deserialization fails
    let body = json!({ "available": MockStoreResponses::weekday_template("25:00", "26:00") });

    let request = Request::builder()
        .method("PUT")
        .uri("/availability")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_user_role_cannot_manage_availability() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("user@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let request = Request::builder()
        .method("GET")
        .uri("/availability")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ==============================================================================
// SERVICE CATALOG
// ==============================================================================

#[tokio::test]
async fn test_create_service_success() {
    let mock_server = MockServer::start().await;

    let provider = TestUser::provider("prov@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&provider, &config.supabase_jwt_secret, Some(24));

    let service_id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::service_response(&service_id, &provider.id, "Deep Tissue Massage", 90)
        ])))
        .mount(&mock_server)
        .await;

    let body = json!({
        "title": "Deep Tissue Massage",
        "category": "massage",
        "description": "90 minute session",
        "price": 120.0,
        "duration_minutes": 90
    });

    let request = Request::builder()
        .method("POST")
        .uri("/services")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["service"]["title"], json!("Deep Tissue Massage"));
}

#[tokio::test]
async fn test_create_service_rejects_nonpositive_duration() {
    let mock_server = MockServer::start().await;

    let provider = TestUser::provider("prov@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&provider, &config.supabase_jwt_secret, Some(24));

    let body = json!({
        "title": "Zero minutes",
        "category": "other",
        "price": 10.0,
        "duration_minutes": 0
    });

    let request = Request::builder()
        .method("POST")
        .uri("/services")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_missing_service_is_not_found() {
    let mock_server = MockServer::start().await;

    let provider = TestUser::provider("prov@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&provider, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/services/{}", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ==============================================================================
// DASHBOARD
// ==============================================================================

#[tokio::test]
async fn test_dashboard_counts() {
    let mock_server = MockServer::start().await;

    let provider = TestUser::provider("prov@example.com");
    let config = test_config_for(&mock_server);
    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&provider, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("select", "count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "count": 3 }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "count"))
        .and(query_param("status", "eq.upcoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "count": 2 }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "count": 10 }])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/dashboard")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["total_services"], json!(3));
    assert_eq!(json["upcoming_appointments"], json!(2));
    assert_eq!(json["total_appointments"], json!(10));
}
