//! HTTP-level tests for the request frame: request ids, error shapes,
//! identity rejection, the proxy requirement, and the login redirect.
//!
//! These run against the full router with a lazy pool; none of them reach
//! the database.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_json, send, test_app, test_config, test_state};
use ohq_api::router::build_app_router;

// ---------------------------------------------------------------------------
// Health and request ids
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let response = send(test_app(), Method::GET, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn responses_echo_a_time_ordered_request_id() {
    let response = send(test_app(), Method::GET, "/health").await;
    let id = response
        .headers()
        .get("x-request-id")
        .expect("X-Request-ID should be set")
        .to_str()
        .unwrap();
    assert_eq!(id.len(), 27, "request ids are 27-char base62 KSUIDs");
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
}

// ---------------------------------------------------------------------------
// Error shapes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_routes_return_a_message_body() {
    let response = send(test_app(), Method::GET, "/no/such/route").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn malformed_queue_ids_are_rejected_as_validation_errors() {
    let response = send(test_app(), Method::GET, "/queues/not-a-ksuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("queue id"));
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identity_routes_reject_anonymous_requests() {
    let response = send(test_app(), Method::GET, "/users/@me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("401 must invalidate the session cookie")
        .to_str()
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

// ---------------------------------------------------------------------------
// Proxy requirement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_forwarded_header_fails_outside_dev_mode() {
    let mut config = test_config();
    config.dev_mode = false;
    let app = build_app_router(test_state(config));

    let response = send(app, Method::GET, "/health").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn forwarded_header_satisfies_the_proxy_requirement() {
    let mut config = test_config();
    config.dev_mode = false;
    let app = build_app_router(test_state(config));

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Login redirect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_redirects_to_the_provider_with_state_and_pkce() {
    let response = send(test_app(), Method::GET, "/oauth2login").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let location = response
        .headers()
        .get(header::LOCATION)
        .expect("redirect needs a Location")
        .to_str()
        .unwrap();
    assert!(location.starts_with("http://idp.localhost/authorize"));
    assert!(location.contains("client_id=queue-client"));
    assert!(location.contains("state="));
    assert!(location.contains("code_challenge_method=S256"));

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set the pre-login session")
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn logout_clears_the_session_and_redirects_home() {
    let response = send(test_app(), Method::GET, "/logout").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));
}
