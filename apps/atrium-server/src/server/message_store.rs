use std::sync::Arc;

use atrium_core::{MessageContent, RecipientGroup, UserId};
use sqlx::{PgPool, Row};
use tokio::sync::{OnceCell, RwLock};

use super::{db::ensure_chat_schema, errors::ChatFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MessageRecord {
    pub(crate) id: i64,
    pub(crate) sender_id: UserId,
    pub(crate) recipient_group: RecipientGroup,
    pub(crate) content: String,
    pub(crate) created_at_unix_ms: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct NewMessage {
    pub(crate) sender_id: UserId,
    pub(crate) recipient_group: RecipientGroup,
    pub(crate) content: MessageContent,
    pub(crate) created_at_unix_ms: i64,
}

/// Append-only chat log. The store assigns ids and owns ordering.
#[derive(Clone)]
pub(crate) struct MessageStore {
    backend: StoreBackend,
}

#[derive(Clone)]
enum StoreBackend {
    Postgres {
        pool: PgPool,
        init: Arc<OnceCell<()>>,
    },
    InMemory {
        records: Arc<RwLock<Vec<MessageRecord>>>,
        #[cfg(test)]
        failing_appends: Arc<std::sync::atomic::AtomicUsize>,
    },
}

impl MessageStore {
    pub(crate) fn postgres(pool: PgPool, init: Arc<OnceCell<()>>) -> Self {
        Self {
            backend: StoreBackend::Postgres { pool, init },
        }
    }

    pub(crate) fn in_memory() -> Self {
        Self {
            backend: StoreBackend::InMemory {
                records: Arc::new(RwLock::new(Vec::new())),
                #[cfg(test)]
                failing_appends: Arc::default(),
            },
        }
    }

    /// Makes the next `count` appends fail as if the database were down.
    #[cfg(test)]
    pub(crate) fn fail_next_appends(&self, count: usize) {
        if let StoreBackend::InMemory {
            failing_appends, ..
        } = &self.backend
        {
            failing_appends.store(count, std::sync::atomic::Ordering::SeqCst);
        }
    }

    pub(crate) async fn append(&self, message: NewMessage) -> Result<MessageRecord, ChatFailure> {
        match &self.backend {
            StoreBackend::Postgres { pool, init } => {
                ensure_chat_schema(pool, init).await?;
                let row = sqlx::query(
                    "INSERT INTO chat_messages (sender_id, recipient_group, content, created_at_unix_ms)
                     VALUES ($1, $2, $3, $4)
                     RETURNING message_id",
                )
                .bind(message.sender_id.get())
                .bind(message.recipient_group.as_str())
                .bind(message.content.as_str())
                .bind(message.created_at_unix_ms)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    tracing::error!(event = "chat.persist", error = %e);
                    ChatFailure::Storage
                })?;
                let id = row
                    .try_get::<i64, _>("message_id")
                    .map_err(|_| ChatFailure::Storage)?;
                Ok(MessageRecord {
                    id,
                    sender_id: message.sender_id,
                    recipient_group: message.recipient_group,
                    content: message.content.into_inner(),
                    created_at_unix_ms: message.created_at_unix_ms,
                })
            }
            StoreBackend::InMemory {
                records,
                #[cfg(test)]
                failing_appends,
            } => {
                #[cfg(test)]
                if failing_appends
                    .fetch_update(
                        std::sync::atomic::Ordering::SeqCst,
                        std::sync::atomic::Ordering::SeqCst,
                        |remaining| remaining.checked_sub(1),
                    )
                    .is_ok()
                {
                    return Err(ChatFailure::Storage);
                }
                let mut records = records.write().await;
                let id = i64::try_from(records.len())
                    .map_err(|_| ChatFailure::Storage)?
                    + 1;
                let record = MessageRecord {
                    id,
                    sender_id: message.sender_id,
                    recipient_group: message.recipient_group,
                    content: message.content.into_inner(),
                    created_at_unix_ms: message.created_at_unix_ms,
                };
                records.push(record.clone());
                Ok(record)
            }
        }
    }

    /// Messages addressed to `group` or to everyone, newest first. Equal
    /// timestamps order by insertion.
    pub(crate) async fn query_by_group(
        &self,
        group: RecipientGroup,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, ChatFailure> {
        match &self.backend {
            StoreBackend::Postgres { pool, init } => {
                ensure_chat_schema(pool, init).await?;
                let limit = i64::try_from(limit).map_err(|_| ChatFailure::InvalidRequest)?;
                let rows = sqlx::query(
                    "SELECT message_id, sender_id, recipient_group, content, created_at_unix_ms
                     FROM chat_messages
                     WHERE recipient_group = $1 OR recipient_group = 'ALL'
                     ORDER BY created_at_unix_ms DESC, message_id DESC
                     LIMIT $2",
                )
                .bind(group.as_str())
                .bind(limit)
                .fetch_all(pool)
                .await
                .map_err(|e| {
                    tracing::error!(event = "chat.history", error = %e);
                    ChatFailure::Storage
                })?;
                rows.iter().map(message_record_from_row).collect()
            }
            StoreBackend::InMemory { records, .. } => {
                let records = records.read().await;
                let mut visible: Vec<MessageRecord> = records
                    .iter()
                    .filter(|record| record.recipient_group.includes(group))
                    .cloned()
                    .collect();
                visible.sort_by(|a, b| {
                    b.created_at_unix_ms
                        .cmp(&a.created_at_unix_ms)
                        .then(b.id.cmp(&a.id))
                });
                visible.truncate(limit);
                Ok(visible)
            }
        }
    }
}

fn message_record_from_row(row: &sqlx::postgres::PgRow) -> Result<MessageRecord, ChatFailure> {
    let sender_id = row
        .try_get::<i64, _>("sender_id")
        .map_err(|_| ChatFailure::Storage)?;
    let recipient_group = row
        .try_get::<String, _>("recipient_group")
        .map_err(|_| ChatFailure::Storage)?;
    Ok(MessageRecord {
        id: row
            .try_get::<i64, _>("message_id")
            .map_err(|_| ChatFailure::Storage)?,
        sender_id: UserId::try_from(sender_id).map_err(|_| ChatFailure::Storage)?,
        recipient_group: RecipientGroup::parse(&recipient_group)
            .map_err(|_| ChatFailure::Storage)?,
        content: row
            .try_get::<String, _>("content")
            .map_err(|_| ChatFailure::Storage)?,
        created_at_unix_ms: row
            .try_get::<i64, _>("created_at_unix_ms")
            .map_err(|_| ChatFailure::Storage)?,
    })
}

#[cfg(test)]
mod tests {
    use atrium_core::{MessageContent, RecipientGroup, Role, UserId};

    use super::{MessageStore, NewMessage};
    use crate::server::errors::ChatFailure;

    fn new_message(group: RecipientGroup, content: &str, at: i64) -> NewMessage {
        NewMessage {
            sender_id: UserId::try_from(1).unwrap(),
            recipient_group: group,
            content: MessageContent::try_from(content.to_owned()).unwrap(),
            created_at_unix_ms: at,
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let store = MessageStore::in_memory();
        let first = store
            .append(new_message(RecipientGroup::All, "one", 10))
            .await
            .unwrap();
        let second = store
            .append(new_message(RecipientGroup::All, "two", 10))
            .await
            .unwrap();
        assert!(second.id > first.id);
        assert_eq!(first.content, "one");
    }

    #[tokio::test]
    async fn role_history_includes_all_and_excludes_other_roles() {
        let store = MessageStore::in_memory();
        let hr = RecipientGroup::Role(Role::Hr);
        store
            .append(new_message(RecipientGroup::All, "everyone", 1))
            .await
            .unwrap();
        store.append(new_message(hr, "payroll", 2)).await.unwrap();
        store
            .append(new_message(RecipientGroup::Role(Role::Finance), "budget", 3))
            .await
            .unwrap();

        let history = store.query_by_group(hr, 100).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["payroll", "everyone"]);
    }

    #[tokio::test]
    async fn timestamp_ties_break_by_insertion_order_newest_first() {
        let store = MessageStore::in_memory();
        for content in ["first", "second", "third"] {
            store
                .append(new_message(RecipientGroup::All, content, 50))
                .await
                .unwrap();
        }
        store
            .append(new_message(RecipientGroup::All, "older", 40))
            .await
            .unwrap();

        let history = store
            .query_by_group(RecipientGroup::Role(Role::Employee), 100)
            .await
            .unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["third", "second", "first", "older"]);
    }

    #[tokio::test]
    async fn history_respects_limit() {
        let store = MessageStore::in_memory();
        for at in 0..5 {
            store
                .append(new_message(RecipientGroup::All, "tick", at))
                .await
                .unwrap();
        }
        let history = store.query_by_group(RecipientGroup::All, 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created_at_unix_ms, 4);
    }

    #[tokio::test]
    async fn failed_appends_store_nothing_and_recover() {
        let store = MessageStore::in_memory();
        store.fail_next_appends(1);

        assert_eq!(
            store
                .append(new_message(RecipientGroup::All, "lost", 1))
                .await
                .unwrap_err(),
            ChatFailure::Storage
        );
        let kept = store
            .append(new_message(RecipientGroup::All, "kept", 2))
            .await
            .unwrap();

        let history = store.query_by_group(RecipientGroup::All, 10).await.unwrap();
        assert_eq!(history, vec![kept]);
    }
}
