use std::{collections::HashMap, sync::Arc};

use atrium_core::UserId;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use super::{
    connection_control::{CloseReason, ConnectionControl},
    fanout::DeliveryFailure,
};

/// Outbound side of one live chat connection.
#[derive(Clone, Debug)]
pub(crate) struct SessionHandle {
    connection_id: Uuid,
    user_id: UserId,
    outbound: mpsc::Sender<String>,
    control: Arc<watch::Sender<ConnectionControl>>,
}

impl SessionHandle {
    pub(crate) fn new(
        user_id: UserId,
        outbound: mpsc::Sender<String>,
        control: watch::Sender<ConnectionControl>,
    ) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            user_id,
            outbound,
            control: Arc::new(control),
        }
    }

    pub(crate) fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub(crate) fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Queues a line without waiting on the socket.
    pub(crate) fn push(&self, line: &str) -> Result<(), DeliveryFailure> {
        match self.outbound.try_send(line.to_owned()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryFailure::Closed),
            Err(mpsc::error::TrySendError::Full(_)) => Err(DeliveryFailure::SlowConsumer),
        }
    }

    pub(crate) fn close(&self, reason: CloseReason) {
        let _ = self.control.send(ConnectionControl::Close(reason));
    }
}

/// Live sessions keyed by user. At most one handle per user.
#[derive(Clone, Default)]
pub(crate) struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<UserId, SessionHandle>>>,
}

impl SessionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Installs `handle` for its user and returns the handle it displaced.
    pub(crate) async fn register(&self, handle: SessionHandle) -> Option<SessionHandle> {
        self.sessions.write().await.insert(handle.user_id, handle)
    }

    /// Removes the user's session only if it is still `connection_id`.
    pub(crate) async fn unregister(&self, user_id: UserId, connection_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&user_id)
            .is_some_and(|handle| handle.connection_id == connection_id)
        {
            sessions.remove(&user_id);
            return true;
        }
        false
    }

    pub(crate) async fn lookup(&self, user_id: UserId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Point-in-time copy; the lock is released before the caller pushes.
    pub(crate) async fn snapshot_all(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
pub(crate) fn test_handle(
    user_id: UserId,
    queue: usize,
) -> (
    SessionHandle,
    mpsc::Receiver<String>,
    watch::Receiver<ConnectionControl>,
) {
    let (outbound_tx, outbound_rx) = mpsc::channel(queue);
    let (control_tx, control_rx) = watch::channel(ConnectionControl::Open);
    (
        SessionHandle::new(user_id, outbound_tx, control_tx),
        outbound_rx,
        control_rx,
    )
}
