//! Phase timers
//!
//! A [`TimerScheduler`] keeps at most one timer alive. Every phase entry
//! cancels whatever is pending before anything new is armed. An expiry that
//! was already on its way when its timer was cancelled is rejected by
//! [`TimerScheduler::is_current`], even if the widget has since re-entered
//! the same phase.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::schema::TimerDelays;
use crate::session::Input;

use super::state::{Event, Phase};

/// The timer currently armed, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    /// Phase the timer was armed for
    pub phase: Phase,
    /// How long after arming it fires
    pub delay: Duration,
}

/// Owner of the single outstanding phase timer.
pub trait TimerScheduler {
    /// Cancels any pending timer, then arms one for `phase` if it is
    /// timer-driven.
    fn on_phase_enter(&mut self, phase: Phase);

    /// Cancels the pending timer, if any.
    fn cancel(&mut self);

    /// Returns the pending timer, if any.
    fn pending(&self) -> Option<PendingTimer>;

    /// Whether a `TimerFired(phase)` arriving now was sent by the timer
    /// currently armed. Schedulers whose expiries cannot outlive a cancel
    /// leave the decision to the phase machine.
    fn is_current(&self, _phase: Phase) -> bool {
        true
    }
}

// ============================================================================
// Tokio scheduler
// ============================================================================

struct ArmedTimer {
    timer: PendingTimer,
    token: CancellationToken,
    handle: JoinHandle<()>,
    /// Set by the task right before it sends.
    fired: Arc<AtomicBool>,
}

/// Scheduler backed by tokio tasks.
///
/// Each armed timer is a task racing `tokio::time::sleep` against its own
/// cancellation token. On expiry it sends `TimerFired(phase)` into the
/// session's input channel. Must be used from within a tokio runtime.
pub struct TokioTimerScheduler {
    delays: TimerDelays,
    tx: mpsc::UnboundedSender<Input>,
    armed: Option<ArmedTimer>,
}

impl TokioTimerScheduler {
    /// Creates a scheduler that delivers timer events into `tx`.
    #[must_use]
    pub const fn new(delays: TimerDelays, tx: mpsc::UnboundedSender<Input>) -> Self {
        Self {
            delays,
            tx,
            armed: None,
        }
    }

    fn arm(&mut self, phase: Phase, delay: Duration) {
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.tx.clone();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = child.cancelled() => {
                    trace!(%phase, "timer task cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    if child.is_cancelled() {
                        trace!(%phase, "timer cancelled after waking");
                        return;
                    }
                    flag.store(true, Ordering::Release);
                    // Receiver gone means the session is over.
                    let _ = tx.send(Input::Event(Event::TimerFired(phase)));
                }
            }
        });

        self.armed = Some(ArmedTimer {
            timer: PendingTimer { phase, delay },
            token,
            handle,
            fired,
        });
    }
}

impl TimerScheduler for TokioTimerScheduler {
    fn on_phase_enter(&mut self, phase: Phase) {
        self.cancel();
        if let Some(delay) = self.delays.delay_for(phase) {
            debug!(%phase, delay = %humantime::format_duration(delay), "arming phase timer");
            self.arm(phase, delay);
        }
    }

    fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            debug!(phase = %armed.timer.phase, "cancelling phase timer");
            armed.token.cancel();
            armed.handle.abort();
        }
    }

    fn pending(&self) -> Option<PendingTimer> {
        self.armed
            .as_ref()
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.timer)
    }

    fn is_current(&self, phase: Phase) -> bool {
        self.armed.as_ref().is_some_and(|armed| {
            armed.timer.phase == phase && armed.fired.load(Ordering::Acquire)
        })
    }
}

impl Drop for TokioTimerScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TokioTimerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioTimerScheduler")
            .field("delays", &self.delays)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Manual scheduler
// ============================================================================

/// What a [`ManualScheduler`] was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    /// A timer was armed.
    Armed(PendingTimer),
    /// A live timer was cancelled.
    Cancelled(Phase),
    /// A timer was fired by the host.
    Fired(Phase),
}

/// Scheduler that never waits.
///
/// Records every arm and cancel, and leaves firing to the host via
/// [`fire`](Self::fire). Used for deterministic runs (`simulate`) and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    delays: TimerDelays,
    pending: Option<PendingTimer>,
    log: Vec<TimerOp>,
}

impl ManualScheduler {
    /// Creates a scheduler using the given delays for bookkeeping.
    #[must_use]
    pub const fn new(delays: TimerDelays) -> Self {
        Self {
            delays,
            pending: None,
            log: Vec::new(),
        }
    }

    /// Takes the pending timer and returns the event it would deliver.
    pub fn fire(&mut self) -> Option<Event> {
        let timer = self.pending.take()?;
        self.log.push(TimerOp::Fired(timer.phase));
        Some(Event::TimerFired(timer.phase))
    }

    /// Every operation so far, oldest first.
    #[must_use]
    pub fn log(&self) -> &[TimerOp] {
        &self.log
    }

    /// Number of timers armed so far.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.log
            .iter()
            .filter(|op| matches!(op, TimerOp::Armed(_)))
            .count()
    }

    /// Number of live timers cancelled so far.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.log
            .iter()
            .filter(|op| matches!(op, TimerOp::Cancelled(_)))
            .count()
    }

    /// Total simulated time of all fired timers.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.log
            .iter()
            .filter_map(|op| match op {
                TimerOp::Fired(phase) => self.delays.delay_for(*phase),
                _ => None,
            })
            .sum()
    }
}

impl TimerScheduler for ManualScheduler {
    fn on_phase_enter(&mut self, phase: Phase) {
        self.cancel();
        if let Some(delay) = self.delays.delay_for(phase) {
            let timer = PendingTimer { phase, delay };
            self.pending = Some(timer);
            self.log.push(TimerOp::Armed(timer));
        }
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.pending.take() {
            self.log.push(TimerOp::Cancelled(timer.phase));
        }
    }

    fn pending(&self) -> Option<PendingTimer> {
        self.pending
    }
}
