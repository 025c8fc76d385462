use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use atrium_core::UserId;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use pasetors::{
    claims::{Claims, ClaimsValidationRules},
    keys::SymmetricKey,
    local,
    token::UntrustedToken,
    version4::V4,
    Local,
};

use super::{
    core::{AppState, ACCESS_TOKEN_TTL_SECS},
    directory::DirectoryUser,
    errors::ChatFailure,
};

const MAX_ACCESS_TOKEN_CHARS: usize = 4096;

/// Mints an access token for `user_id` with the key the server verifies against.
///
/// Account login lives outside this service; this is the contract that service
/// (and the test suite) uses to produce tokens the chat broker accepts.
///
/// # Errors
/// Returns an error if the key or claims cannot be encoded.
pub fn issue_access_token(token_key: &[u8; 32], user_id: UserId) -> anyhow::Result<String> {
    let key =
        SymmetricKey::<V4>::from(token_key).map_err(|e| anyhow!("token key init failed: {e}"))?;
    mint_access_token(&key, user_id, Duration::from_secs(ACCESS_TOKEN_TTL_SECS))
}

pub(crate) fn mint_access_token(
    key: &SymmetricKey<V4>,
    user_id: UserId,
    ttl: Duration,
) -> anyhow::Result<String> {
    let mut claims =
        Claims::new_expires_in(&ttl).map_err(|e| anyhow!("claims init failed: {e}"))?;
    claims
        .subject(&user_id.to_string())
        .map_err(|e| anyhow!("claim sub failed: {e}"))?;
    local::encrypt(key, &claims, None, None).map_err(|e| anyhow!("access token mint failed: {e}"))
}

pub(crate) fn verify_access_token(key: &SymmetricKey<V4>, token: &str) -> anyhow::Result<Claims> {
    let untrusted = UntrustedToken::<Local, V4>::try_from(token).map_err(|e| anyhow!("{e}"))?;
    let validation_rules = ClaimsValidationRules::new();
    let trusted = local::decrypt(key, &untrusted, &validation_rules, None, None)
        .map_err(|e| anyhow!("token decrypt failed: {e}"))?;
    trusted
        .payload_claims()
        .cloned()
        .ok_or_else(|| anyhow!("token claims missing"))
}

/// Resolves a bearer token to the directory account it names.
///
/// Every token problem (malformed, foreign key, expired, unknown subject)
/// is `Ok(None)`. Only a directory outage is an error.
pub(crate) async fn resolve_identity(
    state: &AppState,
    token: &str,
) -> Result<Option<DirectoryUser>, ChatFailure> {
    let Some(user_id) = token_subject(&state.token_key, token) else {
        return Ok(None);
    };
    state.directory.find_user(user_id).await
}

fn token_subject(key: &SymmetricKey<V4>, token: &str) -> Option<UserId> {
    if token.is_empty() || token.len() > MAX_ACCESS_TOKEN_CHARS {
        return None;
    }
    let claims = verify_access_token(key, token).ok()?;
    let subject = claims.get_claim("sub").and_then(serde_json::Value::as_str)?;
    UserId::try_from(subject).ok()
}

/// Token check shared by the HTTP routes and the chat stream handshake.
pub(crate) async fn authenticate_with_token(
    state: &AppState,
    access_token: &str,
) -> Result<DirectoryUser, ChatFailure> {
    let user = resolve_identity(state, access_token)
        .await?
        .ok_or(ChatFailure::Unauthorized)?;
    if !user.is_active {
        return Err(ChatFailure::InactiveUser);
    }
    Ok(user)
}

pub(crate) async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<DirectoryUser, ChatFailure> {
    let access_token = bearer_token(headers).ok_or(ChatFailure::Unauthorized)?;
    authenticate_with_token(state, access_token).await
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

pub(crate) fn now_unix_ms() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
