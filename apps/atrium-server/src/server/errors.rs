use axum::{http::StatusCode, response::IntoResponse, Json};

use super::{
    core::{INTERNAL_ERROR_CLOSE_CODE, POLICY_VIOLATION_CLOSE_CODE},
    metrics::record_auth_failure,
    types::ErrorBody,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChatFailure {
    InvalidRequest,
    InactiveUser,
    Unauthorized,
    IdentityMismatch,
    Storage,
}

impl ChatFailure {
    /// Reason label used in logs, metrics and websocket close frames.
    pub(crate) const fn reason(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InactiveUser => "inactive_user",
            Self::Unauthorized => "invalid_credentials",
            Self::IdentityMismatch => "identity_mismatch",
            Self::Storage => "storage_error",
        }
    }

    pub(crate) const fn is_auth_failure(self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::InactiveUser | Self::IdentityMismatch
        )
    }

    /// Close code sent when this failure ends a stream handshake.
    pub(crate) const fn close_code(self) -> u16 {
        match self {
            Self::Storage => INTERNAL_ERROR_CLOSE_CODE,
            Self::InvalidRequest
            | Self::InactiveUser
            | Self::Unauthorized
            | Self::IdentityMismatch => POLICY_VIOLATION_CLOSE_CODE,
        }
    }
}

impl std::fmt::Display for ChatFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl IntoResponse for ChatFailure {
    fn into_response(self) -> axum::response::Response {
        if self.is_auth_failure() {
            record_auth_failure(self.reason());
        }

        let status = match self {
            Self::InvalidRequest | Self::InactiveUser => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::IdentityMismatch => StatusCode::FORBIDDEN,
            Self::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.reason(),
            }),
        )
            .into_response()
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .with_span_list(true)
        .init();
}
