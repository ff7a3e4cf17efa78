//! Metrics for `ghostbox`.
//!
//! Recorded through the `metrics` facade. No exporter is installed by the
//! crate; a host that wants the numbers installs its own recorder before
//! calling [`describe_metrics`]. Without a recorder every call is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};

use crate::phase::state::Phase;

/// Guard against describing metrics more than once.
static METRICS_DESCRIBED: AtomicBool = AtomicBool::new(false);

/// Registers metric descriptions with the global recorder.
///
/// Safe to call repeatedly; only the first call has an effect.
pub fn describe_metrics() {
    if METRICS_DESCRIBED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already described, skipping");
        return;
    }

    describe_counter!(
        "ghostbox_inputs_total",
        "Inputs delivered to the phase machine, by kind"
    );
    describe_counter!(
        "ghostbox_phase_transitions_total",
        "Phase entries, restarts included"
    );
    describe_counter!(
        "ghostbox_stale_timers_total",
        "Timer events discarded because their phase was already left"
    );
    describe_counter!(
        "ghostbox_timers_armed_total",
        "Phase timers armed, by phase"
    );
    describe_gauge!(
        "ghostbox_current_phase",
        "Currently active phase (1 = active)"
    );
}

/// Records an input of the given kind (`click`, `toggle`, `timer`, `restart`).
pub fn record_input(kind: &'static str) {
    counter!("ghostbox_inputs_total", "kind" => kind).increment(1);
}

/// Records a phase entry and moves the current-phase gauge.
pub fn record_phase_transition(from: Phase, to: Phase) {
    counter!(
        "ghostbox_phase_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    set_current_phase(to);
}

/// Sets the current-phase gauge: 1 for `phase`, 0 for every other phase.
pub fn set_current_phase(phase: Phase) {
    for candidate in Phase::ALL {
        let value = if candidate == phase { 1.0 } else { 0.0 };
        gauge!("ghostbox_current_phase", "phase" => candidate.as_str()).set(value);
    }
}

/// Records a discarded stale timer event.
pub fn record_stale_timer() {
    counter!("ghostbox_stale_timers_total").increment(1);
}

/// Records a timer armed on entry to `phase`.
pub fn record_timer_armed(phase: Phase) {
    counter!("ghostbox_timers_armed_total", "phase" => phase.as_str()).increment(1);
}
