use std::{collections::HashMap, sync::Arc};

use atrium_core::{Role, UserId, Username};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use super::errors::ChatFailure;

/// Account attributes the chat broker reads from the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub user_id: UserId,
    pub username: Username,
    pub role: Role,
    pub is_active: bool,
}

/// Read side of the externally owned user directory.
#[derive(Clone)]
pub(crate) struct UserDirectory {
    backend: DirectoryBackend,
}

#[derive(Clone)]
enum DirectoryBackend {
    Postgres(PgPool),
    InMemory(Arc<RwLock<HashMap<UserId, DirectoryUser>>>),
}

impl UserDirectory {
    pub(crate) fn postgres(pool: PgPool) -> Self {
        Self {
            backend: DirectoryBackend::Postgres(pool),
        }
    }

    pub(crate) fn in_memory(users: impl IntoIterator<Item = DirectoryUser>) -> Self {
        let users = users.into_iter().map(|user| (user.user_id, user)).collect();
        Self {
            backend: DirectoryBackend::InMemory(Arc::new(RwLock::new(users))),
        }
    }

    /// Looks up one account. An unknown id is `Ok(None)`; only directory
    /// I/O fails.
    pub(crate) async fn find_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<DirectoryUser>, ChatFailure> {
        match &self.backend {
            DirectoryBackend::Postgres(pool) => {
                let row = sqlx::query(
                    "SELECT id, username, role, is_active FROM users WHERE id = $1",
                )
                .bind(user_id.get())
                .fetch_optional(pool)
                .await
                .map_err(|error| {
                    tracing::error!(event = "directory.find_user", %user_id, %error);
                    ChatFailure::Storage
                })?;
                Ok(row.as_ref().and_then(directory_user_from_row))
            }
            DirectoryBackend::InMemory(users) => Ok(users.read().await.get(&user_id).cloned()),
        }
    }

    /// Resolves group membership fresh on every call; nothing is cached.
    pub(crate) async fn users_with_role(&self, role: Role) -> Result<Vec<UserId>, ChatFailure> {
        match &self.backend {
            DirectoryBackend::Postgres(pool) => {
                let rows = sqlx::query("SELECT id FROM users WHERE upper(role) = $1")
                    .bind(role.as_str())
                    .fetch_all(pool)
                    .await
                    .map_err(|error| {
                        tracing::error!(event = "directory.users_with_role", role = %role, %error);
                        ChatFailure::Storage
                    })?;
                Ok(rows
                    .iter()
                    .filter_map(|row| row.try_get::<i64, _>("id").ok())
                    .filter_map(|id| UserId::try_from(id).ok())
                    .collect())
            }
            DirectoryBackend::InMemory(users) => Ok(users
                .read()
                .await
                .values()
                .filter(|user| user.role == role)
                .map(|user| user.user_id)
                .collect()),
        }
    }

    #[cfg(test)]
    pub(crate) async fn set_role(&self, user_id: UserId, role: Role) {
        if let DirectoryBackend::InMemory(users) = &self.backend {
            if let Some(user) = users.write().await.get_mut(&user_id) {
                user.role = role;
            }
        }
    }
}

fn directory_user_from_row(row: &sqlx::postgres::PgRow) -> Option<DirectoryUser> {
    let user_id = UserId::try_from(row.try_get::<i64, _>("id").ok()?).ok()?;
    let username = Username::try_from(row.try_get::<String, _>("username").ok()?).ok()?;
    let role = Role::parse(&row.try_get::<String, _>("role").ok()?).ok()?;
    let is_active = row.try_get::<bool, _>("is_active").ok()?;
    Some(DirectoryUser {
        user_id,
        username,
        role,
        is_active,
    })
}
