// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use nim2claude::error::ProxyError;
use serde_json::Value;

async fn render(error: ProxyError) -> (StatusCode, Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_error_display_messages() {
    let errors = vec![
        ProxyError::Config("bad port".to_string()),
        ProxyError::Authentication("Invalid API key".to_string()),
        ProxyError::InvalidRequest("Bad request".to_string()),
        ProxyError::NotFound("Not found".to_string()),
        ProxyError::Upstream { status: 429, message: "slow down".to_string() },
        ProxyError::Translation("Translation failed".to_string()),
        ProxyError::Internal("boom".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_invalid_request_error() {
    let error = ProxyError::InvalidRequest("Missing model field".to_string());
    assert!(format!("{}", error).contains("Missing model field"));
    assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error.error_type(), "invalid_request_error");
}

#[test]
fn test_upstream_status_is_preserved() {
    let error = ProxyError::Upstream { status: 429, message: "quota".to_string() };
    assert_eq!(error.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error.error_type(), "api_error");

    let odd = ProxyError::Upstream { status: 302, message: "moved".to_string() };
    assert_eq!(odd.status_code(), StatusCode::BAD_GATEWAY);
}

#[test]
fn test_translation_error() {
    let error = ProxyError::Translation("Invalid content block".to_string());
    assert!(format!("{}", error).contains("Invalid content block"));
    assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error.error_type(), "translation_error");
}

#[test]
fn test_json_error_conversion() {
    let parse_error = serde_json::from_str::<Value>("{oops").unwrap_err();
    let error: ProxyError = parse_error.into();
    assert!(matches!(error, ProxyError::Json(_)));
    assert_eq!(error.error_type(), "api_error");
}

#[tokio::test]
async fn test_authentication_error_body() {
    let (status, body) = render(ProxyError::Authentication("Invalid API key".to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["type"], "error");
    assert_eq!(body["error"]["type"], "authentication_error");
    assert_eq!(body["error"]["message"], "Invalid API key");
}

#[tokio::test]
async fn test_upstream_body_forwarded_verbatim() {
    let (status, body) = render(ProxyError::Upstream {
        status: 503,
        message: "{\"error\":\"busy\"}".to_string(),
    })
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["message"], "{\"error\":\"busy\"}");
}
