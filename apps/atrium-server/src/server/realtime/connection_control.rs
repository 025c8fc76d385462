use crate::server::core::{POLICY_VIOLATION_CLOSE_CODE, SESSION_REPLACED_CLOSE_CODE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionControl {
    Open,
    Close(CloseReason),
}

/// Server-initiated reasons for ending a live chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReason {
    SlowConsumer,
    SessionReplaced,
    IngressRateLimited,
}

impl CloseReason {
    pub(crate) const fn code(self) -> u16 {
        match self {
            Self::SlowConsumer | Self::IngressRateLimited => POLICY_VIOLATION_CLOSE_CODE,
            Self::SessionReplaced => SESSION_REPLACED_CLOSE_CODE,
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::SlowConsumer => "slow_consumer",
            Self::SessionReplaced => "session_replaced",
            Self::IngressRateLimited => "ingress_rate_limited",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CloseReason;

    #[test]
    fn replaced_sessions_use_application_close_code() {
        assert_eq!(CloseReason::SessionReplaced.code(), 4000);
        assert_eq!(CloseReason::SlowConsumer.code(), 1008);
        assert_eq!(CloseReason::IngressRateLimited.as_str(), "ingress_rate_limited");
    }
}
