use atrium_core::{MessageContent, RecipientGroup, UserId};
use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
};

use crate::server::{
    auth::authenticate,
    core::{AppState, CHAT_PING_INTERVAL_SECS},
    errors::ChatFailure,
    realtime::{connection_control::CloseReason, message_submit::submit_chat_message},
    types::{
        CloseCodeDoc, HistoryQuery, MessageResponse, SendMessageRequest, SendMessageResponse,
        StreamDocsResponse,
    },
};

pub(crate) async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ChatFailure> {
    let sender = authenticate(&state, &headers).await?;
    let recipient_group = RecipientGroup::parse(&payload.recipient_group)
        .map_err(|_| ChatFailure::InvalidRequest)?;
    let content =
        MessageContent::try_from(payload.content).map_err(|_| ChatFailure::InvalidRequest)?;

    let record =
        submit_chat_message(&state, &sender, recipient_group, content, "http").await?;
    tracing::info!(
        event = "chat.send",
        sender_id = %sender.user_id,
        recipient_group = %record.recipient_group,
        message_id = record.id,
    );
    Ok(Json(SendMessageResponse {
        msg: "Message sent",
        message_id: record.id,
    }))
}

pub(crate) async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(role): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageResponse>>, ChatFailure> {
    authenticate(&state, &headers).await?;
    let group = RecipientGroup::parse(&role).map_err(|_| ChatFailure::InvalidRequest)?;
    let limit = match query.limit {
        None => state.runtime.history_limit_max,
        Some(0) => return Err(ChatFailure::InvalidRequest),
        Some(limit) => limit.min(state.runtime.history_limit_max),
    };

    let history = state.messages.query_by_group(group, limit).await?;
    Ok(Json(history.into_iter().map(MessageResponse::from).collect()))
}

pub(crate) async fn stream_docs(
    Path(user_id): Path<String>,
) -> Result<Json<StreamDocsResponse>, ChatFailure> {
    let user_id = UserId::try_from(user_id.as_str()).map_err(|_| ChatFailure::InvalidRequest)?;
    Ok(Json(StreamDocsResponse {
        websocket_url: format!("ws://<host>/api/v1/chat/ws/{user_id}?token=<your-token>"),
        description: "WebSocket endpoint for real-time chat. Text frames you send are stored \
                      and broadcast to everyone connected as \"<username>: <content>\".",
        close_codes: vec![
            CloseCodeDoc {
                code: ChatFailure::Unauthorized.close_code(),
                reason: ChatFailure::Unauthorized.reason(),
            },
            CloseCodeDoc {
                code: ChatFailure::IdentityMismatch.close_code(),
                reason: ChatFailure::IdentityMismatch.reason(),
            },
            CloseCodeDoc {
                code: CloseReason::SlowConsumer.code(),
                reason: CloseReason::SlowConsumer.as_str(),
            },
            CloseCodeDoc {
                code: CloseReason::IngressRateLimited.code(),
                reason: CloseReason::IngressRateLimited.as_str(),
            },
            CloseCodeDoc {
                code: CloseReason::SessionReplaced.code(),
                reason: CloseReason::SessionReplaced.as_str(),
            },
        ],
        ping_interval_secs: CHAT_PING_INTERVAL_SECS,
    }))
}
