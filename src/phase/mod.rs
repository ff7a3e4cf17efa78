//! Widget phase engine
//!
//! The checkbox moves through a fixed lifecycle of phases, driven by user
//! toggles and phase timers.
//!
//! # Architecture
//!
//! - [`WidgetState`]: Immutable state value (phase, checkbox value, cycle count)
//! - [`PhaseMachine`]: Pure transition table from `(state, event)` to the next state
//! - [`TimerScheduler`]: Owner of the single outstanding phase timer
//! - [`derive_view`]: Presentation flags computed from state

pub mod machine;
pub mod state;
pub mod timer;
pub mod view;

pub use machine::{IgnoreReason, Outcome, PhaseMachine, Step};
pub use state::{Event, Phase, WidgetState};
pub use timer::{ManualScheduler, PendingTimer, TimerOp, TimerScheduler, TokioTimerScheduler};
pub use view::{RenderKind, ViewFlags, derive_view};
