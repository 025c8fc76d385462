use sqlx::PgPool;
use tokio::sync::OnceCell;

use super::errors::ChatFailure;

const CREATE_CHAT_MESSAGES_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS chat_messages (
                    message_id BIGSERIAL PRIMARY KEY,
                    sender_id BIGINT NOT NULL,
                    recipient_group TEXT NOT NULL CHECK (recipient_group IN (
                        'ALL', 'ADMIN', 'CEO', 'HR', 'FINANCE', 'EVENT_MANAGER', 'EMPLOYEE'
                    )),
                    content VARCHAR(255) NOT NULL,
                    created_at_unix_ms BIGINT NOT NULL
                )";
const CREATE_CHAT_MESSAGES_GROUP_CREATED_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_group_created
                    ON chat_messages(recipient_group, created_at_unix_ms DESC, message_id DESC)";

/// Creates the chat tables once per process. The `users` table belongs to the
/// directory service and is never created here.
pub(crate) async fn ensure_chat_schema(
    pool: &PgPool,
    init: &OnceCell<()>,
) -> Result<(), ChatFailure> {
    const SCHEMA_INIT_LOCK_ID: i64 = 0x4154_5249_554d_4348;

    init.get_or_try_init(|| async move {
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_INIT_LOCK_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query(CREATE_CHAT_MESSAGES_TABLE_SQL)
            .execute(&mut *tx)
            .await?;
        sqlx::query(CREATE_CHAT_MESSAGES_GROUP_CREATED_INDEX_SQL)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok::<(), sqlx::Error>(())
    })
    .await
    .map_err(|e| {
        tracing::error!(event = "db.init", error = %e);
        ChatFailure::Storage
    })?;

    Ok(())
}
