//! Prometheus metrics for deck-server.
//!
//! Command, validation and autosave counters are recorded by `deck-protocol`
//! through the `metrics` facade; this module installs the recorder and owns
//! the connection-level metrics.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const VIEW_CONNECTIONS_ACTIVE: &str = "deck_view_connections_active";
const EVENTS_TOTAL: &str = "deck_events_total";
const FRAMES_REJECTED_TOTAL: &str = "deck_frames_rejected_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Increment active view connections.
pub fn inc_view_connections() {
    gauge!(VIEW_CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement active view connections.
pub fn dec_view_connections() {
    gauge!(VIEW_CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record an event forwarded to the host.
pub fn record_event(kind: &'static str) {
    counter!(EVENTS_TOTAL, "type" => kind).increment(1);
}

/// Record a frame that was not a command, e.g. binary data.
pub fn record_frame_rejected(reason: &'static str) {
    counter!(FRAMES_REJECTED_TOTAL, "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        inc_view_connections();
        record_event("elementSelected");
        record_frame_rejected("binary");
        dec_view_connections();
    }
}
