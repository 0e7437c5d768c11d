//! Counters for the events domain.

use metrics::{counter, histogram};

/// Event domain metrics recorder
pub struct EventMetrics;

impl EventMetrics {
    /// `outcome` is one of `accepted`, `unauthenticated`, `rejected`, `failed`.
    pub fn record_submission(outcome: &'static str) {
        counter!("event_submissions_total", "outcome" => outcome).increment(1);
    }

    /// `action` is `approve`, `reject` or `delete`.
    pub fn record_moderation(action: &'static str, success: bool) {
        counter!(
            "event_moderation_actions_total",
            "action" => action,
            "outcome" => if success { "ok" } else { "error" }
        )
        .increment(1);

        tracing::debug!(action, success, "Moderation action recorded");
    }

    pub fn record_fetch(returned: usize) {
        counter!("event_fetches_total", "outcome" => "ok").increment(1);
        histogram!("event_fetch_result_size").record(returned as f64);
    }

    pub fn record_fetch_failure() {
        counter!("event_fetches_total", "outcome" => "error").increment(1);
    }
}
