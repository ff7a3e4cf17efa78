//! Widget state representation
//!
//! The widget is described by a single [`WidgetState`] value that is
//! replaced wholesale on every transition. [`Phase`] drives everything
//! else: which inputs are accepted, which timer is armed and what the
//! view renders.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Behavioral mode of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Freely clickable; completed on/off cycles are counted.
    #[default]
    Normal,
    /// Locked after too many cycles.
    Disabled1,
    /// Clickable again, but only for a single on/off cycle.
    OneToggle,
    /// Locked after the single allowed cycle.
    Disabled2,
    /// Any click turns the checkbox into a ghost.
    GhostTrigger,
    /// The ghost is showing.
    Ghost,
    /// Nothing is showing.
    Hidden,
    /// Permanently inert checkbox (legacy terminal phase).
    Greyed,
    /// A restart control is offered (canonical terminal phase).
    Restart,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Self; 9] = [
        Self::Normal,
        Self::Disabled1,
        Self::OneToggle,
        Self::Disabled2,
        Self::GhostTrigger,
        Self::Ghost,
        Self::Hidden,
        Self::Greyed,
        Self::Restart,
    ];

    /// Returns `true` for phases that leave on a timer rather than on input.
    #[must_use]
    pub const fn is_timer_driven(self) -> bool {
        matches!(
            self,
            Self::Disabled1 | Self::Disabled2 | Self::Ghost | Self::Hidden
        )
    }

    /// Returns `true` when toggles are dropped in this phase.
    #[must_use]
    pub const fn is_inert(self) -> bool {
        !matches!(self, Self::Normal | Self::OneToggle | Self::GhostTrigger)
    }

    /// Returns `true` when the view shows the checkbox itself.
    #[must_use]
    pub const fn renders_checkbox(self) -> bool {
        !matches!(self, Self::Ghost | Self::Hidden | Self::Restart)
    }

    /// Stable lowercase name, used for logs, metrics labels and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Disabled1 => "disabled1",
            Self::OneToggle => "one_toggle",
            Self::Disabled2 => "disabled2",
            Self::GhostTrigger => "ghost_trigger",
            Self::Ghost => "ghost",
            Self::Hidden => "hidden",
            Self::Greyed => "greyed",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete widget state.
///
/// `Default` is the initial state: `Normal`, unchecked, no cycles counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WidgetState {
    /// Current phase
    pub phase: Phase,
    /// Logical value of the checkbox
    pub is_checked: bool,
    /// Completed checked→unchecked cycles while in `Normal`
    pub press_count: u32,
}

impl WidgetState {
    /// The state a widget session starts in, and returns to on restart.
    pub const INITIAL: Self = Self {
        phase: Phase::Normal,
        is_checked: false,
        press_count: 0,
    };

    /// Returns the initial state.
    #[must_use]
    pub const fn initial() -> Self {
        Self::INITIAL
    }
}

/// Input to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Event {
    /// The user flipped the control to the given value.
    Toggle(bool),
    /// A timer armed on entry to the given phase elapsed.
    TimerFired(Phase),
    /// Return to the initial state.
    Restart,
}

impl Event {
    /// Short name of the event kind, used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Toggle(_) => "toggle",
            Self::TimerFired(_) => "timer",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toggle(v) => write!(f, "toggle({v})"),
            Self::TimerFired(p) => write!(f, "timer({p})"),
            Self::Restart => f.write_str("restart"),
        }
    }
}
