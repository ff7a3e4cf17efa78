//! Widget session
//!
//! A [`Session`] owns one widget: its state, the transition table, the
//! timer scheduler and the view. Inputs are applied one at a time; each
//! runs to completion (transition, timer bookkeeping, render) before the
//! next is looked at.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::schema::WidgetConfig;
use crate::error::StaleTimerEvent;
use crate::observability::events::{self, EventEmitter, RunSummary, StopReason};
use crate::observability::metrics;
use crate::phase::machine::{IgnoreReason, Outcome, PhaseMachine, Step};
use crate::phase::state::{Event, Phase, WidgetState};
use crate::phase::timer::TimerScheduler;
use crate::phase::view::{ViewFlags, derive_view};
use crate::view::View;

/// Something delivered to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// The user clicked the checkbox; becomes `Toggle(!is_checked)`.
    Click,
    /// An event for the phase machine.
    Event(Event),
    /// Re-render the current state without changing it.
    Refresh,
    /// End the session at the user's request.
    Quit,
    /// The input source ended; ends the session like a closed channel.
    Closed,
}

impl Input {
    /// Short name used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Event(event) => event.kind(),
            Self::Refresh => "refresh",
            Self::Quit => "quit",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => f.write_str("click"),
            Self::Event(event) => write!(f, "{event}"),
            Self::Refresh => f.write_str("refresh"),
            Self::Quit => f.write_str("quit"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

impl From<Event> for Input {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

/// One widget and everything that drives it.
pub struct Session<S, V> {
    id: Uuid,
    machine: PhaseMachine,
    state: WidgetState,
    scheduler: S,
    view: V,
    emitter: Arc<EventEmitter>,
    summary: RunSummary,
}

impl<S: TimerScheduler, V: View> Session<S, V> {
    /// Starts a session in the initial state and renders it once.
    ///
    /// No timer is armed: the initial phase is not timer-driven.
    pub fn new(config: &WidgetConfig, scheduler: S, view: V, emitter: Arc<EventEmitter>) -> Self {
        let id = Uuid::new_v4();
        let mut session = Self {
            id,
            machine: PhaseMachine::from_config(config),
            state: WidgetState::initial(),
            scheduler,
            view,
            emitter,
            summary: RunSummary::default(),
        };

        info!(
            session_id = %id,
            variant = config.variant.as_str(),
            threshold = config.cycle_threshold,
            terminal = %config.terminal.phase(),
            "session started"
        );
        session.emitter.emit(events::Event::SessionStarted {
            timestamp: Utc::now(),
            session_id: id.to_string(),
            variant: config.variant.as_str().to_string(),
            cycle_threshold: config.cycle_threshold,
        });
        metrics::set_current_phase(session.state.phase);
        session.render();
        session
    }

    /// Applies one input and returns the resulting state.
    pub fn dispatch(&mut self, input: Input) -> &WidgetState {
        let event = match input {
            Input::Click => Event::Toggle(!self.state.is_checked),
            Input::Event(event) => event,
            Input::Refresh => {
                self.render();
                return &self.state;
            }
            Input::Quit | Input::Closed => return &self.state,
        };

        self.summary.inputs += 1;
        metrics::record_input(input.kind());

        if let Event::TimerFired(expected) = event
            && !self.scheduler.is_current(expected)
        {
            let stale = StaleTimerEvent {
                expected,
                current: self.state.phase,
            };
            self.on_ignored(self.state, input, IgnoreReason::StaleTimer(stale));
            return &self.state;
        }

        let prev = self.state;
        let step = self.machine.apply(prev, event);
        self.state = step.state;

        match step.outcome {
            Outcome::Ignored(reason) => self.on_ignored(prev, input, reason),
            Outcome::Advanced { from, to } => self.on_phase_entered(from, to),
            Outcome::Reset { from } => {
                debug!(%from, "restart");
                self.on_phase_entered(from, Phase::Normal);
            }
            Outcome::Updated => {
                debug!(
                    phase = %self.state.phase,
                    is_checked = self.state.is_checked,
                    press_count = self.state.press_count,
                    "state updated"
                );
            }
        }

        if changed(&step, prev) {
            self.render();
        }
        &self.state
    }

    /// Consumes inputs until the channel closes, [`Input::Quit`] or
    /// [`Input::Closed`] arrives, or `cancel` fires, then stops the session.
    ///
    /// A scheduler that holds its own sender keeps the channel open, so a
    /// host reading from a finite source sends `Closed` when it runs dry.
    pub async fn run(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Input>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let reason = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break StopReason::Cancelled,
                input = rx.recv() => match input {
                    None | Some(Input::Closed) => break StopReason::InputClosed,
                    Some(Input::Quit) => break StopReason::UserQuit,
                    Some(input) => {
                        self.dispatch(input);
                    }
                },
            }
        };
        self.finish(reason)
    }

    /// Cancels the pending timer, emits `SessionStopped` and returns the
    /// final summary.
    pub fn finish(&mut self, reason: StopReason) -> RunSummary {
        self.scheduler.cancel();
        let summary = self.summary();

        info!(
            session_id = %self.id,
            %reason,
            inputs = summary.inputs,
            transitions = summary.transitions,
            stale_timers = summary.stale_timers,
            final_phase = %summary.final_phase,
            "session stopped"
        );
        self.emitter.emit(events::Event::SessionStopped {
            timestamp: Utc::now(),
            reason,
            summary,
        });
        summary
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &WidgetState {
        &self.state
    }

    /// Presentation of the current state.
    #[must_use]
    pub const fn view_flags(&self) -> ViewFlags {
        derive_view(&self.state)
    }

    /// The timer scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Mutable access to the scheduler, for hosts that fire timers by hand.
    pub const fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// The view.
    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Counters so far.
    #[must_use]
    pub const fn summary(&self) -> RunSummary {
        RunSummary {
            final_phase: self.state.phase,
            ..self.summary
        }
    }

    /// Random identifier of this session.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    fn on_ignored(&mut self, prev: WidgetState, input: Input, reason: IgnoreReason) {
        match reason {
            IgnoreReason::StaleTimer(stale) => {
                debug!(expected = %stale.expected, current = %stale.current, "{stale}");
                self.summary.stale_timers += 1;
                metrics::record_stale_timer();
                self.emitter.emit(events::Event::StaleTimerDiscarded {
                    timestamp: Utc::now(),
                    expected: stale.expected,
                    current: stale.current,
                });
            }
            IgnoreReason::InertPhase | IgnoreReason::Unhandled => {
                debug!(phase = %prev.phase, %input, "input ignored");
                self.summary.ignored += 1;
                self.emitter.emit(events::Event::InputIgnored {
                    timestamp: Utc::now(),
                    phase: prev.phase,
                    input: input.to_string(),
                });
            }
        }
    }

    fn on_phase_entered(&mut self, from: Phase, to: Phase) {
        self.scheduler.on_phase_enter(to);
        self.summary.transitions += 1;

        info!(
            %from,
            %to,
            press_count = self.state.press_count,
            "phase transition"
        );
        metrics::record_phase_transition(from, to);
        self.emitter.emit(events::Event::PhaseEntered {
            timestamp: Utc::now(),
            from,
            phase: to,
            press_count: self.state.press_count,
        });

        if let Some(timer) = self.scheduler.pending().filter(|t| t.phase == to) {
            metrics::record_timer_armed(to);
            self.emitter.emit(events::Event::TimerArmed {
                timestamp: Utc::now(),
                phase: to,
                delay_ms: u64::try_from(timer.delay.as_millis()).unwrap_or(u64::MAX),
            });
        }
    }

    fn render(&mut self) {
        let flags = derive_view(&self.state);
        if let Err(e) = self.view.render(&flags) {
            warn!(error = %e, "failed to render widget");
        }
    }
}

/// A restart always re-renders, even when issued from the initial state.
fn changed(step: &Step, prev: WidgetState) -> bool {
    matches!(step.outcome, Outcome::Reset { .. }) || step.state != prev
}

impl<S: fmt::Debug, V> fmt::Debug for Session<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::config::schema::{TimerDelays, Variant};
    use crate::phase::timer::{ManualScheduler, TimerOp, TokioTimerScheduler};
    use crate::phase::view::RenderKind;
    use crate::view::RecordingView;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn events(&self) -> Vec<serde_json::Value> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }

        fn types(&self) -> Vec<String> {
            self.events()
                .iter()
                .map(|e| e["type"].as_str().unwrap().to_string())
                .collect()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn manual_session(
        config: &WidgetConfig,
    ) -> (Session<ManualScheduler, RecordingView>, Capture) {
        let capture = Capture::default();
        let emitter = Arc::new(EventEmitter::new(Box::new(capture.clone())));
        let session = Session::new(
            config,
            ManualScheduler::new(config.delays),
            RecordingView::new(),
            emitter,
        );
        (session, capture)
    }

    fn cycle(session: &mut Session<ManualScheduler, RecordingView>) {
        session.dispatch(Input::Click);
        session.dispatch(Input::Click);
    }

    fn fire(session: &mut Session<ManualScheduler, RecordingView>) -> WidgetState {
        let event = session.scheduler_mut().fire().unwrap();
        *session.dispatch(Input::Event(event))
    }

    #[test]
    fn test_new_renders_initial_state_and_arms_nothing() {
        let (session, capture) = manual_session(&WidgetConfig::default());
        assert_eq!(*session.state(), WidgetState::initial());
        assert_eq!(session.view().frames().len(), 1);
        assert!(session.scheduler().pending().is_none());
        assert_eq!(capture.types(), vec!["SessionStarted"]);
        assert_eq!(capture.events()[0]["variant"], "canonical");
    }

    #[test]
    fn test_click_flips_value() {
        let (mut session, _) = manual_session(&WidgetConfig::default());
        assert!(session.dispatch(Input::Click).is_checked);
        assert!(session.view_flags().spin);
        assert!(!session.dispatch(Input::Click).is_checked);
        assert_eq!(session.state().press_count, 1);
    }

    #[test]
    fn test_third_cycle_locks_and_arms_timer() {
        let (mut session, capture) = manual_session(&WidgetConfig::default());
        cycle(&mut session);
        cycle(&mut session);
        assert_eq!(session.state().phase, Phase::Normal);
        cycle(&mut session);

        assert_eq!(session.state().phase, Phase::Disabled1);
        assert_eq!(session.state().press_count, 3);
        assert_eq!(
            session.scheduler().pending().map(|t| t.delay),
            Some(Duration::from_secs(5))
        );
        assert!(session.view_flags().disabled);

        let types = capture.types();
        assert!(types.ends_with(&["PhaseEntered".to_string(), "TimerArmed".to_string()]));
    }

    #[test]
    fn test_inert_click_is_ignored_without_render() {
        let (mut session, capture) = manual_session(&WidgetConfig::default());
        for _ in 0..3 {
            cycle(&mut session);
        }
        let frames = session.view().frames().len();
        let before = *session.state();

        assert_eq!(*session.dispatch(Input::Click), before);
        assert_eq!(session.view().frames().len(), frames);
        assert_eq!(session.summary().ignored, 1);
        assert_eq!(capture.types().last().unwrap(), "InputIgnored");
    }

    #[test]
    fn test_stale_timer_is_discarded() {
        let (mut session, capture) = manual_session(&WidgetConfig::default());
        let frames = session.view().frames().len();

        session.dispatch(Input::Event(Event::TimerFired(Phase::Disabled1)));

        assert_eq!(*session.state(), WidgetState::initial());
        assert_eq!(session.view().frames().len(), frames);
        assert!(session.scheduler().log().is_empty());
        assert_eq!(session.summary().stale_timers, 1);

        let last = capture.events().pop().unwrap();
        assert_eq!(last["type"], "StaleTimerDiscarded");
        assert_eq!(last["expected"], "disabled1");
        assert_eq!(last["current"], "normal");
    }

    #[test]
    fn test_restart_cancels_pending_timer() {
        let (mut session, _) = manual_session(&WidgetConfig::default());
        for _ in 0..3 {
            cycle(&mut session);
        }
        assert!(session.scheduler().pending().is_some());

        session.dispatch(Input::Event(Event::Restart));

        assert_eq!(*session.state(), WidgetState::initial());
        assert!(session.scheduler().pending().is_none());
        assert_eq!(
            session.scheduler().log().last(),
            Some(&TimerOp::Cancelled(Phase::Disabled1))
        );
    }

    #[test]
    fn test_restart_from_initial_still_renders() {
        let (mut session, _) = manual_session(&WidgetConfig::default());
        session.dispatch(Input::Event(Event::Restart));
        assert_eq!(session.view().frames().len(), 2);
        assert_eq!(session.summary().transitions, 1);
    }

    #[test]
    fn test_refresh_renders_without_counting() {
        let (mut session, _) = manual_session(&WidgetConfig::default());
        session.dispatch(Input::Refresh);
        assert_eq!(session.view().frames().len(), 2);
        assert_eq!(session.summary().inputs, 0);
    }

    #[test]
    fn test_full_canonical_scenario() {
        let (mut session, capture) = manual_session(&WidgetConfig::default());
        for _ in 0..3 {
            cycle(&mut session);
        }

        let state = fire(&mut session);
        assert_eq!(state.phase, Phase::OneToggle);
        assert_eq!(state.press_count, 0);

        cycle(&mut session);
        assert_eq!(session.state().phase, Phase::Disabled2);
        assert_eq!(
            session.scheduler().pending().map(|t| t.delay),
            Some(Duration::from_secs(3))
        );

        assert_eq!(fire(&mut session).phase, Phase::GhostTrigger);
        session.dispatch(Input::Click);
        assert_eq!(session.state().phase, Phase::Ghost);
        assert_eq!(session.view_flags().render, RenderKind::Ghost);

        assert_eq!(fire(&mut session).phase, Phase::Hidden);
        assert_eq!(fire(&mut session).phase, Phase::Restart);
        assert!(session.scheduler().pending().is_none());
        assert_eq!(session.view_flags().render, RenderKind::RestartButton);

        session.dispatch(Input::Event(Event::Restart));
        assert_eq!(*session.state(), WidgetState::initial());

        let summary = session.finish(StopReason::ScriptFinished);
        assert_eq!(summary.final_phase, Phase::Normal);
        assert_eq!(summary.transitions, 8);
        assert_eq!(capture.types().last().unwrap(), "SessionStopped");
    }

    #[test]
    fn test_legacy_ends_greyed() {
        let (mut session, _) = manual_session(&Variant::Legacy.preset());
        for _ in 0..3 {
            cycle(&mut session);
        }
        fire(&mut session);
        cycle(&mut session);
        assert_eq!(
            session.scheduler().pending().map(|t| t.delay),
            Some(Duration::from_secs(10))
        );
        fire(&mut session);
        session.dispatch(Input::Click);
        fire(&mut session);
        assert_eq!(fire(&mut session).phase, Phase::Greyed);

        let flags = session.view_flags();
        assert!(flags.greyed);
        assert!(flags.disabled);
        assert_eq!(session.dispatch(Input::Click).phase, Phase::Greyed);
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let (mut session, capture) = manual_session(&WidgetConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Input::Click).unwrap();
        tx.send(Input::Click).unwrap();
        drop(tx);

        let summary = session.run(&mut rx, CancellationToken::new()).await;
        assert_eq!(summary.inputs, 2);
        assert_eq!(session.state().press_count, 1);

        let last = capture.events().pop().unwrap();
        assert_eq!(last["reason"], "input_closed");
    }

    #[tokio::test]
    async fn test_run_stops_on_quit() {
        let (mut session, capture) = manual_session(&WidgetConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Input::Click).unwrap();
        tx.send(Input::Quit).unwrap();
        tx.send(Input::Click).unwrap();

        let summary = session.run(&mut rx, CancellationToken::new()).await;
        assert_eq!(summary.inputs, 1);
        assert!(session.state().is_checked);
        assert_eq!(capture.events().pop().unwrap()["reason"], "user_quit");
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_stops_despite_scheduler_sender() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioTimerScheduler::new(TimerDelays::CANONICAL, tx.clone());
        let capture = Capture::default();
        let mut session = Session::new(
            &WidgetConfig::default(),
            scheduler,
            RecordingView::new(),
            Arc::new(EventEmitter::new(Box::new(capture.clone()))),
        );

        tx.send(Input::Click).unwrap();
        tx.send(Input::Closed).unwrap();
        drop(tx);

        let summary = tokio::time::timeout(
            Duration::from_millis(300),
            session.run(&mut rx, CancellationToken::new()),
        )
        .await
        .expect("session should stop on Closed");
        assert_eq!(summary.inputs, 1);
        assert_eq!(capture.events().pop().unwrap()["reason"], "input_closed");
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (mut session, _) = manual_session(&WidgetConfig::default());
        let (_tx, mut rx) = mpsc::unbounded_channel::<Input>();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = session.run(&mut rx, cancel).await;
        assert_eq!(summary.inputs, 0);
        assert_eq!(summary.final_phase, Phase::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_real_timers() {
        let config = WidgetConfig {
            cycle_threshold: 1,
            ..WidgetConfig::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioTimerScheduler::new(TimerDelays::CANONICAL, tx.clone());
        let mut session = Session::new(
            &config,
            scheduler,
            RecordingView::new(),
            Arc::new(EventEmitter::noop()),
        );

        tx.send(Input::Click).unwrap();
        tx.send(Input::Click).unwrap();

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            // Disabled1 lasts 5s; stop shortly after it expires.
            tokio::time::sleep(Duration::from_millis(5100)).await;
            stopper.cancel();
        });

        let summary = session.run(&mut rx, cancel).await;
        assert_eq!(summary.final_phase, Phase::OneToggle);
        assert_eq!(session.state().press_count, 0);
        assert!(session.scheduler().pending().is_none());
    }
}
