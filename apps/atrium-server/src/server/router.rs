use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, StatusCode},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{
    core::{AppConfig, AppState},
    handlers::chat::{get_messages, send_message, stream_docs},
    realtime::chat_ws,
    types::{health, metrics},
};

/// Build the axum router with global security middleware.
///
/// # Errors
/// Returns an error if configured limits are invalid or the state cannot be built.
pub fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    if config.rate_limit_requests_per_minute == 0 {
        return Err(anyhow!(
            "rate limit must be at least 1 request per minute"
        ));
    }
    if config.chat_ingress_messages_per_window == 0 || config.chat_ingress_window.is_zero() {
        return Err(anyhow!(
            "chat ingress limit must allow at least 1 message per non-empty window"
        ));
    }
    if config.chat_outbound_queue == 0 {
        return Err(anyhow!("chat outbound queue must hold at least 1 line"));
    }
    if config.max_chat_frame_bytes == 0 {
        return Err(anyhow!("max chat frame bytes must be at least 1 byte"));
    }
    if config.history_limit_max == 0 {
        return Err(anyhow!(
            "history limit max must be at least 1 message per request"
        ));
    }

    let app_state = AppState::new(config)?;
    router_with_state(config, app_state)
}

/// Routes and middleware around an already built state.
pub(crate) fn router_with_state(config: &AppConfig, app_state: AppState) -> anyhow::Result<Router> {
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .period(Duration::from_secs(60))
            .burst_size(config.rate_limit_requests_per_minute)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("invalid governor configuration"))?,
    );
    let request_id_header = HeaderName::from_static("x-request-id");
    let governor_layer = GovernorLayer::new(governor_config);

    let chat_routes = Router::new()
        .route("/send", post(send_message))
        .route("/messages/{role}", get(get_messages))
        .route("/ws-docs/{user_id}", get(stream_docs))
        .route("/ws/{user_id}", get(chat_ws));

    Ok(Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api/v1/chat", chat_routes)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
                .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout,
                ))
                .layer(governor_layer),
        ))
}
