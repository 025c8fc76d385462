use atrium_core::RecipientGroup;

use crate::server::core::AppState;

use super::{
    fanout::{dispatch_chat_line, DeliveryReport},
    session_registry::SessionHandle,
};

/// Resolves the live sessions for `group` and pushes `line` to each.
///
/// Role membership comes from the directory at call time, so role changes
/// apply to the next delivery. Users without a live session are skipped, and a
/// directory outage delivers to nobody.
pub(crate) async fn deliver(state: &AppState, group: RecipientGroup, line: &str) -> DeliveryReport {
    let (targets, scope) = match group {
        RecipientGroup::All => (state.sessions.snapshot_all().await, "all"),
        RecipientGroup::Role(role) => {
            let members = match state.directory.users_with_role(role).await {
                Ok(members) => members,
                Err(failure) => {
                    tracing::warn!(
                        event = "chat.deliver",
                        group = %group,
                        outcome = "membership_unavailable",
                        reason = failure.reason(),
                    );
                    Vec::new()
                }
            };
            let mut targets: Vec<SessionHandle> = Vec::with_capacity(members.len());
            for user_id in members {
                if let Some(handle) = state.sessions.lookup(user_id).await {
                    targets.push(handle);
                }
            }
            (targets, "role")
        }
    };

    let report = dispatch_chat_line(&targets, line, scope);
    tracing::debug!(
        event = "chat.deliver",
        group = %group,
        delivered = report.delivered,
        failed = report.failed,
    );
    report
}
