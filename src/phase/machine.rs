//! Phase transition table
//!
//! [`PhaseMachine`] is a pure function from `(WidgetState, Event)` to the
//! next `WidgetState`. It never suspends, never fails and performs no I/O;
//! combinations it does not recognize return the input unchanged.

use crate::config::schema::{TerminalPhase, WidgetConfig};
use crate::error::StaleTimerEvent;

use super::state::{Event, Phase, WidgetState};

/// Default number of completed cycles that locks the checkbox.
pub const DEFAULT_CYCLE_THRESHOLD: u32 = 3;

/// Why an event left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Toggle arrived while input is inert.
    InertPhase,
    /// Timer armed for a phase the widget has already left.
    StaleTimer(StaleTimerEvent),
    /// Timer for a phase that has no timer-driven exit.
    Unhandled,
}

/// Classification of a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The phase changed.
    Advanced {
        /// Phase before the event
        from: Phase,
        /// Phase after the event
        to: Phase,
    },
    /// Same phase, checkbox value or cycle count possibly changed.
    Updated,
    /// Restart returned the widget to its initial state.
    Reset {
        /// Phase the restart was issued from
        from: Phase,
    },
    /// The event was dropped.
    Ignored(IgnoreReason),
}

/// Result of [`PhaseMachine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// The next state
    pub state: WidgetState,
    /// What happened
    pub outcome: Outcome,
}

impl Step {
    const fn ignored(state: WidgetState, reason: IgnoreReason) -> Self {
        Self {
            state,
            outcome: Outcome::Ignored(reason),
        }
    }

    fn from_states(prev: WidgetState, next: WidgetState) -> Self {
        let outcome = if prev.phase == next.phase {
            Outcome::Updated
        } else {
            Outcome::Advanced {
                from: prev.phase,
                to: next.phase,
            }
        };
        Self {
            state: next,
            outcome,
        }
    }

    /// Returns `true` if the widget entered a phase, including re-entering
    /// `Normal` through a restart.
    #[must_use]
    pub const fn entered_phase(&self) -> bool {
        matches!(self.outcome, Outcome::Advanced { .. } | Outcome::Reset { .. })
    }
}

/// The widget's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseMachine {
    cycle_threshold: u32,
    terminal: TerminalPhase,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(DEFAULT_CYCLE_THRESHOLD, TerminalPhase::Restart)
    }
}

impl PhaseMachine {
    /// Creates a machine that locks after `cycle_threshold` cycles and ends
    /// in `terminal` once the hidden phase times out.
    ///
    /// A threshold of zero behaves like one: the first completed cycle locks.
    #[must_use]
    pub const fn new(cycle_threshold: u32, terminal: TerminalPhase) -> Self {
        Self {
            cycle_threshold,
            terminal,
        }
    }

    /// Creates a machine from the resolved widget configuration.
    #[must_use]
    pub const fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.cycle_threshold, config.terminal)
    }

    /// Returns the cycle threshold.
    #[must_use]
    pub const fn cycle_threshold(&self) -> u32 {
        self.cycle_threshold
    }

    /// Returns the phase entered after `Hidden`.
    #[must_use]
    pub const fn terminal_phase(&self) -> Phase {
        self.terminal.phase()
    }

    /// Computes the next state.
    #[must_use]
    pub fn transition(&self, state: WidgetState, event: Event) -> WidgetState {
        self.apply(state, event).state
    }

    /// Computes the next state and classifies what happened.
    #[must_use]
    pub fn apply(&self, state: WidgetState, event: Event) -> Step {
        match event {
            Event::Toggle(value) => self.on_toggle(state, value),
            Event::TimerFired(expected) => self.on_timer(state, expected),
            Event::Restart => Step {
                state: WidgetState::INITIAL,
                outcome: Outcome::Reset { from: state.phase },
            },
        }
    }

    fn on_toggle(&self, state: WidgetState, value: bool) -> Step {
        let completes_cycle = state.is_checked && !value;

        let next = match state.phase {
            Phase::Normal if completes_cycle => {
                let press_count = state.press_count.saturating_add(1);
                let phase = if press_count >= self.cycle_threshold {
                    Phase::Disabled1
                } else {
                    Phase::Normal
                };
                WidgetState {
                    phase,
                    is_checked: false,
                    press_count,
                }
            }
            Phase::OneToggle if completes_cycle => WidgetState {
                phase: Phase::Disabled2,
                is_checked: false,
                ..state
            },
            Phase::Normal | Phase::OneToggle => WidgetState {
                is_checked: value,
                ..state
            },
            Phase::GhostTrigger => WidgetState {
                phase: Phase::Ghost,
                ..state
            },
            Phase::Disabled1
            | Phase::Disabled2
            | Phase::Ghost
            | Phase::Hidden
            | Phase::Greyed
            | Phase::Restart => return Step::ignored(state, IgnoreReason::InertPhase),
        };

        Step::from_states(state, next)
    }

    fn on_timer(&self, state: WidgetState, expected: Phase) -> Step {
        if state.phase != expected {
            return Step::ignored(
                state,
                IgnoreReason::StaleTimer(StaleTimerEvent {
                    expected,
                    current: state.phase,
                }),
            );
        }

        let next = match state.phase {
            Phase::Disabled1 => WidgetState {
                phase: Phase::OneToggle,
                press_count: 0,
                ..state
            },
            Phase::Disabled2 => WidgetState {
                phase: Phase::GhostTrigger,
                ..state
            },
            Phase::Ghost => WidgetState {
                phase: Phase::Hidden,
                ..state
            },
            Phase::Hidden => WidgetState {
                phase: self.terminal_phase(),
                ..state
            },
            Phase::Normal
            | Phase::OneToggle
            | Phase::GhostTrigger
            | Phase::Greyed
            | Phase::Restart => return Step::ignored(state, IgnoreReason::Unhandled),
        };

        Step::from_states(state, next)
    }
}
