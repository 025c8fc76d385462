use std::time::{Duration, Instant};

use atrium_core::{MessageContent, RecipientGroup};
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};

use super::{
    core::{AppState, CHAT_PING_INTERVAL_SECS},
    directory::DirectoryUser,
    metrics::{record_auth_failure, record_ws_disconnect},
    types::ChatStreamQuery,
};

pub(crate) mod broadcast;
pub(crate) mod connection_control;
pub(crate) mod fanout;
pub(crate) mod handshake;
pub(crate) mod ingress_rate_limit;
pub(crate) mod message_submit;
pub(crate) mod session_registry;

use connection_control::{CloseReason, ConnectionControl};
use handshake::authenticate_stream;
use ingress_rate_limit::ChatIngressLimiter;
use message_submit::submit_chat_message;
use session_registry::SessionHandle;

const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Upgrades first; authentication happens on the open socket so a rejected
/// client still receives a policy-violation close frame.
pub(crate) async fn chat_ws(
    State(state): State<AppState>,
    Path(claimed_user_id): Path<String>,
    Query(query): Query<ChatStreamQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_frame_bytes = state.runtime.max_chat_frame_bytes;
    ws.max_message_size(max_frame_bytes)
        .max_frame_size(max_frame_bytes)
        .on_upgrade(move |socket| async move {
            handle_chat_connection(state, socket, claimed_user_id, query.token).await;
        })
}

pub(crate) async fn handle_chat_connection(
    state: AppState,
    mut socket: WebSocket,
    claimed_user_id: String,
    token: Option<String>,
) {
    let user = match authenticate_stream(&state, &claimed_user_id, token.as_deref()).await {
        Ok(user) => user,
        Err(failure) => {
            if failure.is_auth_failure() {
                record_auth_failure(failure.reason());
            }
            record_ws_disconnect("handshake_rejected");
            tracing::info!(
                event = "chat.ws.handshake",
                outcome = "rejected",
                reason = failure.reason(),
            );
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: failure.close_code(),
                    reason: failure.reason().into(),
                })))
                .await;
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<String>(state.runtime.chat_outbound_queue);
    let (control_tx, mut control_rx) = watch::channel(ConnectionControl::Open);
    let handle = SessionHandle::new(user.user_id, outbound_tx, control_tx);
    let connection_id = handle.connection_id();
    if let Some(superseded) = state.sessions.register(handle.clone()).await {
        superseded.close(CloseReason::SessionReplaced);
        tracing::info!(
            event = "chat.ws.session_replaced",
            user_id = %user.user_id,
            superseded_connection_id = %superseded.connection_id(),
        );
    }
    tracing::info!(
        event = "chat.ws.handshake",
        outcome = "accepted",
        user_id = %user.user_id,
        %connection_id,
    );

    let (mut sink, mut stream) = socket.split();
    let mut writer_control = control_rx.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ping_interval =
            tokio::time::interval(Duration::from_secs(CHAT_PING_INTERVAL_SECS));
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                control_change = writer_control.changed() => {
                    if control_change.is_err() {
                        break;
                    }
                    let control = *writer_control.borrow();
                    if let ConnectionControl::Close(reason) = control {
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code: reason.code(),
                                reason: reason.as_str().into(),
                            })))
                            .await;
                        break;
                    }
                }
                maybe_line = outbound_rx.recv() => {
                    match maybe_line {
                        Some(line) => {
                            if sink.send(Message::Text(line.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let mut ingress = ChatIngressLimiter::new(
        state.runtime.chat_ingress_messages_per_window,
        state.runtime.chat_ingress_window,
    );
    let disconnect_reason: &'static str = loop {
        tokio::select! {
            biased;
            control_change = control_rx.changed() => {
                if control_change.is_err() {
                    break "control_dropped";
                }
                let control = *control_rx.borrow();
                if let ConnectionControl::Close(reason) = control {
                    break reason.as_str();
                }
            }
            incoming = stream.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(_)) => break "socket_error",
                    None => break "connection_closed",
                };
                match message {
                    Message::Text(_) | Message::Binary(_) if !ingress.admit(Instant::now()) => {
                        handle.close(CloseReason::IngressRateLimited);
                    }
                    Message::Text(text) => {
                        handle_inbound_text(&state, &user, text.as_str()).await;
                    }
                    Message::Binary(_) => {
                        tracing::debug!(
                            event = "chat.ws.frame_rejected",
                            user_id = %user.user_id,
                            reason = "binary_frame",
                        );
                    }
                    Message::Close(_) => break "client_close",
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        }
    };

    let server_initiated = matches!(*control_rx.borrow(), ConnectionControl::Close(_));
    state.sessions.unregister(user.user_id, connection_id).await;
    record_ws_disconnect(disconnect_reason);
    if server_initiated {
        let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await;
    }
    send_task.abort();
    tracing::info!(
        event = "chat.ws.disconnect",
        user_id = %user.user_id,
        %connection_id,
        reason = disconnect_reason,
    );
}

/// Stream frames always go to everyone. Invalid content and storage failures
/// drop the frame and keep the connection open.
async fn handle_inbound_text(state: &AppState, user: &DirectoryUser, text: &str) {
    let Ok(content) = MessageContent::try_from(text.to_owned()) else {
        tracing::debug!(
            event = "chat.ws.frame_rejected",
            user_id = %user.user_id,
            reason = "invalid_content",
        );
        return;
    };
    let _ = submit_chat_message(state, user, RecipientGroup::All, content, "stream").await;
}
