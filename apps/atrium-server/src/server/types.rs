use axum::{
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{core::METRICS_TEXT_CONTENT_TYPE, message_store::MessageRecord, metrics::render_metrics};

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(crate) async fn metrics() -> Response {
    (
        [(CONTENT_TYPE, METRICS_TEXT_CONTENT_TYPE)],
        render_metrics(),
    )
        .into_response()
}

/// Group and content arrive as raw strings so that an unknown group maps to
/// `invalid_request` instead of a generic body rejection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SendMessageRequest {
    pub(crate) recipient_group: String,
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageResponse {
    pub(crate) msg: &'static str,
    pub(crate) message_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) id: i64,
    pub(crate) sender_id: i64,
    pub(crate) recipient_group: &'static str,
    pub(crate) content: String,
    pub(crate) timestamp_unix_ms: i64,
}

impl From<MessageRecord> for MessageResponse {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            sender_id: record.sender_id.get(),
            recipient_group: record.recipient_group.as_str(),
            content: record.content,
            timestamp_unix_ms: record.created_at_unix_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatStreamQuery {
    pub(crate) token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StreamDocsResponse {
    pub(crate) websocket_url: String,
    pub(crate) description: &'static str,
    pub(crate) close_codes: Vec<CloseCodeDoc>,
    pub(crate) ping_interval_secs: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CloseCodeDoc {
    pub(crate) code: u16,
    pub(crate) reason: &'static str,
}
