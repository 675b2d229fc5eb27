//! Assertion helpers for tests.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use super::app::TestResponse;
use super::fixtures::PUBLIC_BASE_URL;

/// Assert response has expected status code
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status,
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert response is OK (200)
pub fn assert_ok(response: &TestResponse) {
    assert_status(response, StatusCode::OK);
}

/// Assert an error response carries the expected status and code
pub fn assert_error(response: &TestResponse, expected: u16, code: &str) {
    assert_eq!(
        response.status.as_u16(),
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"].as_u64(), Some(expected as u64));
    assert_eq!(
        json["code"].as_str(),
        Some(code),
        "Unexpected error code. Full response: {}",
        serde_json::to_string_pretty(&json).unwrap()
    );
    assert!(json["error"].is_string(), "Expected an error message");
}

/// Assert a successful generation response and return its download URL
pub fn assert_generated(response: &TestResponse) -> String {
    assert_ok(response);
    let json: serde_json::Value = response.json();

    let url = json["download_url"]
        .as_str()
        .expect("Expected download_url to be a string")
        .to_string();
    assert!(
        url.starts_with(PUBLIC_BASE_URL),
        "download_url {url} should start with {PUBLIC_BASE_URL}"
    );
    assert_eq!(
        json.as_object().map(|o| o.len()),
        Some(1),
        "download_url should be the only field"
    );
    url
}
