//! Integration tests for the relay HTTP surface.
//!
//! Verifies that:
//! - POST without a usable prompt returns 400 "Prompt is required"
//! - OPTIONS answers the CORS preflight with all three headers
//! - Other methods return exactly 405
//! - A successful provider response comes back as a base64 PNG data URL
//! - Provider errors are forwarded with their status and body text
//! - An unreachable provider maps to 500 "Internal server error"
//! - Every branch carries `Access-Control-Allow-Origin: *`

use std::sync::Arc;

use axum::body::Body;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http::Request;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use imgrelay::config::{ApiToken, Config, LoggingConfig, ServerConfig, UpstreamConfig};
use imgrelay::relay::{create_router, AppState};

/// Token used by the test app; the success-path mock requires it verbatim.
const TEST_TOKEN: &str = "hf_test_token";

/// Build a relay test app pointed at the given upstream URL.
fn test_app(upstream_url: &str) -> axum::Router {
    let config = Config {
        server: ServerConfig::default(),
        upstream: UpstreamConfig {
            url: upstream_url.to_string(),
            api_token: ApiToken::from(TEST_TOKEN),
        },
        logging: LoggingConfig::default(),
    };

    let state = AppState {
        http_client: reqwest::Client::new(),
        config: Arc::new(config),
    };

    create_router(state)
}

/// Parse the response body as JSON and return (status_code, json_value).
async fn parse_body(response: axum::response::Response) -> (http::StatusCode, serde_json::Value) {
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), 16_777_216)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or_default();
    (status, json)
}

/// Assert the three fixed CORS headers are present.
fn assert_cors_headers(response: &axum::response::Response) {
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "*",
        "allow-origin must be * on every response"
    );
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "POST, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type"
    );
}

fn post_json(body: &str) -> Request<Body> {
    Request::post("/")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Validation: missing / empty prompt -> 400
// ============================================================================

#[tokio::test]
async fn test_post_missing_prompt_returns_400() {
    let app = test_app("http://127.0.0.1:1/unused");

    let response = app.oneshot(post_json("{}")).await.unwrap();
    assert_cors_headers(&response);

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Prompt is required");
}

#[tokio::test]
async fn test_post_empty_prompt_returns_400() {
    let app = test_app("http://127.0.0.1:1/unused");

    let response = app.oneshot(post_json(r#"{"prompt": ""}"#)).await.unwrap();
    assert_cors_headers(&response);

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Prompt is required");
}

#[tokio::test]
async fn test_post_null_prompt_returns_400() {
    let app = test_app("http://127.0.0.1:1/unused");

    let response = app.oneshot(post_json(r#"{"prompt": null}"#)).await.unwrap();

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Prompt is required");
}

// ============================================================================
// Malformed JSON body -> 500 (unexpected failure, not a validation error)
// ============================================================================

#[tokio::test]
async fn test_post_malformed_json_returns_500() {
    let app = test_app("http://127.0.0.1:1/unused");

    let response = app.oneshot(post_json("not json at all")).await.unwrap();
    assert_cors_headers(&response);

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert!(
        json["message"].as_str().is_some(),
        "500 body should carry a failure message"
    );
}

// ============================================================================
// CORS preflight
// ============================================================================

#[tokio::test]
async fn test_options_returns_cors_headers() {
    let app = test_app("http://127.0.0.1:1/unused");

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_cors_headers(&response);

    let body_bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    assert!(body_bytes.is_empty(), "preflight response has no body");
}

#[tokio::test]
async fn test_options_on_any_path_returns_cors_headers() {
    let app = test_app("http://127.0.0.1:1/unused");

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/some/deep/path")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_cors_headers(&response);
}

// ============================================================================
// Unsupported methods -> 405
// ============================================================================

#[tokio::test]
async fn test_get_returns_405() {
    let app = test_app("http://127.0.0.1:1/unused");

    let request = Request::get("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    assert_cors_headers(&response);

    let body_bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    assert_eq!(&body_bytes[..], b"Method not allowed");
}

#[tokio::test]
async fn test_delete_and_put_return_405() {
    for m in ["DELETE", "PUT"] {
        let app = test_app("http://127.0.0.1:1/unused");
        let request = Request::builder()
            .method(m)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            http::StatusCode::METHOD_NOT_ALLOWED,
            "{} should be rejected",
            m
        );
        assert_cors_headers(&response);
    }
}

// ============================================================================
// Success path: provider bytes -> base64 data URL
// ============================================================================

#[tokio::test]
async fn test_successful_generation_returns_data_url() {
    let mock_server = MockServer::start().await;

    // Non-UTF8 bytes, so the round-trip proves binary-safe handling
    let image_bytes: Vec<u8> = vec![0x89, 0x50, 0x4E, 0x47, 0x00, 0xFF, 0x13, 0x37];

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", format!("Bearer {}", TEST_TOKEN)))
        .and(header("x-use-cache", "false"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({ "inputs": "a red fox" })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image_bytes.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(post_json(r#"{"prompt": "a red fox"}"#))
        .await
        .unwrap();
    assert_cors_headers(&response);

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(json["success"], true);

    let image = json["image"].as_str().expect("image field");
    let encoded = image
        .strip_prefix("data:image/png;base64,")
        .expect("data URL prefix");
    assert_eq!(encoded, BASE64.encode(&image_bytes));

    let decoded = BASE64.decode(encoded).expect("valid base64");
    assert_eq!(decoded, image_bytes, "decoding must reproduce the bytes");
}

// ============================================================================
// Provider error: status and body text forwarded
// ============================================================================

#[tokio::test]
async fn test_provider_503_forwarded_with_details() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(post_json(r#"{"prompt": "a red fox"}"#))
        .await
        .unwrap();
    assert_cors_headers(&response);

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "Image generation failed");
    assert_eq!(json["details"], "model loading");
}

#[tokio::test]
async fn test_provider_401_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&mock_server)
        .await;

    let app = test_app(&mock_server.uri());
    let response = app
        .oneshot(post_json(r#"{"prompt": "a red fox"}"#))
        .await
        .unwrap();

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Image generation failed");
    assert_eq!(json["details"], "invalid token");
}

// ============================================================================
// Unreachable provider -> 500
// ============================================================================

#[tokio::test]
async fn test_unreachable_provider_returns_500() {
    // Grab a port that nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = test_app(&format!("http://{}", addr));
    let response = app
        .oneshot(post_json(r#"{"prompt": "a red fox"}"#))
        .await
        .unwrap();
    assert_cors_headers(&response);

    let (status, json) = parse_body(response).await;
    assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert!(
        json["message"].as_str().is_some(),
        "500 body should carry the underlying failure text"
    );
}
