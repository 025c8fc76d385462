use atrium_core::UserId;

use crate::server::{
    auth::authenticate_with_token, core::AppState, directory::DirectoryUser, errors::ChatFailure,
};

/// Checks a stream's token and its path-declared identity.
///
/// Runs after the websocket upgrade. The token goes through the same check as
/// the HTTP routes; the resolved account must be the one the path names.
pub(crate) async fn authenticate_stream(
    state: &AppState,
    claimed_user_id: &str,
    token: Option<&str>,
) -> Result<DirectoryUser, ChatFailure> {
    let token = token.ok_or(ChatFailure::Unauthorized)?;
    let user = authenticate_with_token(state, token).await?;

    let claimed = UserId::try_from(claimed_user_id).ok();
    if claimed != Some(user.user_id) {
        tracing::warn!(
            event = "chat.ws.handshake",
            outcome = "identity_mismatch",
            claimed_user_id,
            resolved_user_id = %user.user_id,
        );
        return Err(ChatFailure::IdentityMismatch);
    }

    Ok(user)
}
