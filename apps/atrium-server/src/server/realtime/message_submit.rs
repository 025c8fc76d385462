use atrium_core::{render_chat_line, MessageContent, RecipientGroup};

use crate::server::{
    auth::now_unix_ms,
    core::AppState,
    directory::DirectoryUser,
    errors::ChatFailure,
    message_store::{MessageRecord, NewMessage},
    metrics::{record_chat_persisted, record_chat_storage_failure},
};

use super::broadcast::deliver;

/// Persists one message, then fans it out. Delivery runs only after a
/// successful append and its outcome never changes the result.
pub(crate) async fn submit_chat_message(
    state: &AppState,
    sender: &DirectoryUser,
    recipient_group: RecipientGroup,
    content: MessageContent,
    source: &'static str,
) -> Result<MessageRecord, ChatFailure> {
    let line = render_chat_line(&sender.username, &content);
    let record = state
        .messages
        .append(NewMessage {
            sender_id: sender.user_id,
            recipient_group,
            content,
            created_at_unix_ms: now_unix_ms(),
        })
        .await
        .inspect_err(|failure| {
            record_chat_storage_failure(source);
            tracing::error!(
                event = "chat.persist",
                outcome = "failed",
                source,
                sender_id = %sender.user_id,
                recipient_group = %recipient_group,
                reason = failure.reason(),
            );
        })?;
    record_chat_persisted(source);

    deliver(state, record.recipient_group, &line).await;
    Ok(record)
}
