use std::{collections::HashMap, fmt::Write as _};

use super::core::{MetricsState, METRICS_STATE};

pub(crate) fn metrics_state() -> &'static MetricsState {
    METRICS_STATE.get_or_init(MetricsState::default)
}

pub(crate) fn render_metrics() -> String {
    let auth_failures = metrics_state()
        .auth_failures
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());
    let ws_disconnects = metrics_state()
        .ws_disconnects
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());
    let chat_deliveries = metrics_state()
        .chat_deliveries
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());
    let persisted = metrics_state()
        .chat_messages_persisted
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());
    let storage_failures = metrics_state()
        .chat_storage_failures
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());

    let mut output = String::new();
    output.push_str("# HELP atrium_auth_failures_total Count of auth-related failures by reason\n");
    output.push_str("# TYPE atrium_auth_failures_total counter\n");
    let mut auth_entries: Vec<_> = auth_failures.into_iter().collect();
    auth_entries.sort_by_key(|(reason, _)| *reason);
    for (reason, value) in auth_entries {
        let _ = writeln!(output, "atrium_auth_failures_total{{reason=\"{reason}\"}} {value}");
    }

    output.push_str(
        "# HELP atrium_ws_disconnects_total Count of websocket disconnect events by reason\n",
    );
    output.push_str("# TYPE atrium_ws_disconnects_total counter\n");
    let mut ws_entries: Vec<_> = ws_disconnects.into_iter().collect();
    ws_entries.sort_by_key(|(reason, _)| *reason);
    for (reason, value) in ws_entries {
        let _ = writeln!(output, "atrium_ws_disconnects_total{{reason=\"{reason}\"}} {value}");
    }

    output.push_str(
        "# HELP atrium_chat_deliveries_total Count of chat pushes to live sessions by scope and outcome\n",
    );
    output.push_str("# TYPE atrium_chat_deliveries_total counter\n");
    let mut delivery_entries: Vec<_> = chat_deliveries.into_iter().collect();
    delivery_entries.sort_by_key(|((scope, outcome), _)| (*scope, *outcome));
    for ((scope, outcome), value) in delivery_entries {
        let _ = writeln!(
            output,
            "atrium_chat_deliveries_total{{scope=\"{scope}\",outcome=\"{outcome}\"}} {value}"
        );
    }

    output.push_str(
        "# HELP atrium_chat_messages_persisted_total Count of chat messages stored by source\n",
    );
    output.push_str("# TYPE atrium_chat_messages_persisted_total counter\n");
    let mut persisted_entries: Vec<_> = persisted.into_iter().collect();
    persisted_entries.sort_by_key(|(source, _)| *source);
    for (source, value) in persisted_entries {
        let _ = writeln!(
            output,
            "atrium_chat_messages_persisted_total{{source=\"{source}\"}} {value}"
        );
    }

    output.push_str(
        "# HELP atrium_chat_storage_failures_total Count of chat messages that failed to persist by source\n",
    );
    output.push_str("# TYPE atrium_chat_storage_failures_total counter\n");
    let mut failure_entries: Vec<_> = storage_failures.into_iter().collect();
    failure_entries.sort_by_key(|(source, _)| *source);
    for (source, value) in failure_entries {
        let _ = writeln!(
            output,
            "atrium_chat_storage_failures_total{{source=\"{source}\"}} {value}"
        );
    }

    output
}

pub(crate) fn record_auth_failure(reason: &'static str) {
    if let Ok(mut counters) = metrics_state().auth_failures.lock() {
        let entry = counters.entry(reason).or_insert(0);
        *entry += 1;
    }
}

pub(crate) fn record_ws_disconnect(reason: &'static str) {
    if let Ok(mut counters) = metrics_state().ws_disconnects.lock() {
        let entry = counters.entry(reason).or_insert(0);
        *entry += 1;
    }
}

pub(crate) fn record_chat_delivery(scope: &'static str, outcome: &'static str) {
    if let Ok(mut counters) = metrics_state().chat_deliveries.lock() {
        let entry = counters.entry((scope, outcome)).or_insert(0);
        *entry += 1;
    }
}

pub(crate) fn record_chat_persisted(source: &'static str) {
    if let Ok(mut counters) = metrics_state().chat_messages_persisted.lock() {
        let entry = counters.entry(source).or_insert(0);
        *entry += 1;
    }
}

pub(crate) fn record_chat_storage_failure(source: &'static str) {
    if let Ok(mut counters) = metrics_state().chat_storage_failures.lock() {
        let entry = counters.entry(source).or_insert(0);
        *entry += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{record_chat_delivery, record_ws_disconnect, render_metrics};

    #[test]
    fn rendered_metrics_include_recorded_labels() {
        record_ws_disconnect("client_close");
        record_chat_delivery("role", "slow_consumer");

        let rendered = render_metrics();
        assert!(rendered.contains("# TYPE atrium_ws_disconnects_total counter"));
        assert!(rendered.contains("atrium_ws_disconnects_total{reason=\"client_close\"}"));
        assert!(rendered
            .contains("atrium_chat_deliveries_total{scope=\"role\",outcome=\"slow_consumer\"}"));
    }
}
