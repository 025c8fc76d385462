use std::time::Duration;

use atrium_server::{build_router, AppConfig};
use axum::{body::Body, http::Request, http::StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn rejects_body_over_limit() {
    let config = AppConfig {
        max_body_bytes: 32,
        request_timeout: Duration::from_secs(1),
        rate_limit_requests_per_minute: 60,
        ..AppConfig::default()
    };
    let app = build_router(&config).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/chat/send")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(
            r#"{"recipient_group":"ALL","content":"this payload is definitely too large"}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn rate_limits_per_client_ip() {
    let config = AppConfig {
        max_body_bytes: 1024,
        request_timeout: Duration::from_secs(1),
        rate_limit_requests_per_minute: 2,
        ..AppConfig::default()
    };
    let app = build_router(&config).unwrap();

    let request = |ip: &str| {
        Request::builder()
            .method("GET")
            .uri("/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request("198.51.100.9")).await.unwrap();
    let second = app.clone().oneshot(request("198.51.100.9")).await.unwrap();
    let third = app.clone().oneshot(request("198.51.100.9")).await.unwrap();
    let other_client = app.oneshot(request("198.51.100.10")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other_client.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_are_exposed_as_prometheus_text() {
    let app = build_router(&AppConfig::default()).unwrap();
    let request = Request::builder()
        .method("GET")
        .uri("/metrics")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/plain")));
}

#[test]
fn zero_limits_are_rejected() {
    let cases = [
        AppConfig {
            chat_outbound_queue: 0,
            ..AppConfig::default()
        },
        AppConfig {
            max_chat_frame_bytes: 0,
            ..AppConfig::default()
        },
        AppConfig {
            history_limit_max: 0,
            ..AppConfig::default()
        },
        AppConfig {
            chat_ingress_messages_per_window: 0,
            ..AppConfig::default()
        },
    ];
    for config in cases {
        assert!(build_router(&config).is_err());
    }
}
