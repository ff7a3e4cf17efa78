//! Presentation directives derived from widget state.

use serde::Serialize;

use super::state::{Phase, WidgetState};

/// What the view should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    /// The checkbox itself
    Checkbox,
    /// The ghost
    Ghost,
    /// An empty placeholder of the same size
    Placeholder,
    /// A restart control
    RestartButton,
}

/// Everything a view needs to render the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewFlags {
    /// What to draw
    pub render: RenderKind,
    /// Checkbox shows as checked
    pub checked: bool,
    /// Checkbox refuses input
    pub disabled: bool,
    /// Checkbox spins
    pub spin: bool,
    /// Checkbox is greyed out
    pub greyed: bool,
}

/// Maps a state to its presentation.
#[must_use]
pub const fn derive_view(state: &WidgetState) -> ViewFlags {
    let render = match state.phase {
        Phase::Ghost => RenderKind::Ghost,
        Phase::Hidden => RenderKind::Placeholder,
        Phase::Restart => RenderKind::RestartButton,
        _ => RenderKind::Checkbox,
    };
    let checkbox = state.phase.renders_checkbox();

    ViewFlags {
        render,
        checked: checkbox && state.is_checked,
        disabled: matches!(
            state.phase,
            Phase::Disabled1 | Phase::Disabled2 | Phase::Greyed
        ),
        spin: checkbox && state.is_checked && !matches!(state.phase, Phase::Greyed),
        greyed: matches!(state.phase, Phase::Greyed),
    }
}
