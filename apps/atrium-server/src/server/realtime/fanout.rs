use crate::server::metrics::record_chat_delivery;

use super::{connection_control::CloseReason, session_registry::SessionHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryFailure {
    Closed,
    SlowConsumer,
}

impl DeliveryFailure {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::SlowConsumer => "slow_consumer",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DeliveryReport {
    pub(crate) delivered: usize,
    pub(crate) failed: usize,
}

/// Pushes `line` to every handle. A failing handle never stops the rest; a
/// slow consumer is told to close instead of stalling the batch.
pub(crate) fn dispatch_chat_line(
    targets: &[SessionHandle],
    line: &str,
    scope: &'static str,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for target in targets {
        match target.push(line) {
            Ok(()) => {
                record_chat_delivery(scope, "delivered");
                report.delivered += 1;
            }
            Err(failure) => {
                record_chat_delivery(scope, failure.as_str());
                tracing::debug!(
                    event = "chat.deliver",
                    outcome = failure.as_str(),
                    user_id = %target.user_id(),
                    connection_id = %target.connection_id(),
                );
                if failure == DeliveryFailure::SlowConsumer {
                    target.close(CloseReason::SlowConsumer);
                }
                report.failed += 1;
            }
        }
    }

    report
}
