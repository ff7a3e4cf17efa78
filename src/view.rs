//! Renderers for [`ViewFlags`].
//!
//! A [`View`] is the host's drawing surface. It receives the full set of
//! flags every time the state changes and is free to redraw from scratch.

use std::io::Write;

use serde::Serialize;

use crate::phase::state::WidgetState;
use crate::phase::view::{RenderKind, ViewFlags, derive_view};

/// A drawing surface for the widget.
pub trait View {
    /// Draws the widget for the given flags.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying writer fails.
    fn render(&mut self, flags: &ViewFlags) -> std::io::Result<()>;
}

// ============================================================================
// Terminal
// ============================================================================

/// Draws one human-readable line per render.
///
/// ```text
/// [ ]
/// [x] ~spinning~
/// [-] (disabled)
/// ```
#[derive(Debug)]
pub struct TerminalView<W> {
    out: W,
    color: bool,
}

impl<W: Write> TerminalView<W> {
    /// Creates a view writing to `out`, without colors.
    pub const fn new(out: W) -> Self {
        Self { out, color: false }
    }

    /// Dims disabled and greyed checkboxes with ANSI escapes when `color`
    /// is set.
    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Consumes the view, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalView<std::io::Stdout> {
    /// Creates a view writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> View for TerminalView<W> {
    fn render(&mut self, flags: &ViewFlags) -> std::io::Result<()> {
        writeln!(self.out, "{}", format_styled(flags, self.color))?;
        self.out.flush()
    }
}

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Like [`format_line`], dimming disabled and greyed checkboxes when
/// `color` is set.
#[must_use]
pub fn format_styled(flags: &ViewFlags, color: bool) -> String {
    let line = format_line(flags);
    if color && (flags.disabled || flags.greyed) {
        format!("{DIM}{line}{RESET}")
    } else {
        line
    }
}

/// Formats the flags as a single line of text.
#[must_use]
pub fn format_line(flags: &ViewFlags) -> String {
    match flags.render {
        RenderKind::Ghost => "(o_o) boo".to_string(),
        RenderKind::Placeholder => "   ".to_string(),
        RenderKind::RestartButton => "[ Restart ]".to_string(),
        RenderKind::Checkbox => {
            let mark = if flags.greyed {
                '#'
            } else if flags.disabled {
                '-'
            } else if flags.checked {
                'x'
            } else {
                ' '
            };
            let mut line = format!("[{mark}]");
            if flags.spin {
                line.push_str(" ~spinning~");
            }
            if flags.greyed {
                line.push_str(" (greyed)");
            } else if flags.disabled {
                line.push_str(" (disabled)");
            }
            line
        }
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Writes each render as one JSON object per line.
#[derive(Debug)]
pub struct JsonView<W> {
    out: W,
}

impl<W: Write> JsonView<W> {
    /// Creates a view writing to `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the view, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> View for JsonView<W> {
    fn render(&mut self, flags: &ViewFlags) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, flags)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

// ============================================================================
// Recording
// ============================================================================

/// Keeps every render in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    frames: Vec<ViewFlags>,
}

impl RecordingView {
    /// Creates an empty recording.
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// All frames rendered so far.
    #[must_use]
    pub fn frames(&self) -> &[ViewFlags] {
        &self.frames
    }

    /// The most recent frame.
    #[must_use]
    pub fn last(&self) -> Option<&ViewFlags> {
        self.frames.last()
    }
}

impl View for RecordingView {
    fn render(&mut self, flags: &ViewFlags) -> std::io::Result<()> {
        self.frames.push(*flags);
        Ok(())
    }
}

/// A render paired with the state it came from, as printed by `simulate`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Frame {
    /// State that was rendered
    #[serde(flatten)]
    pub state: WidgetState,
    /// What was drawn
    pub view: ViewFlags,
}

impl From<WidgetState> for Frame {
    fn from(state: WidgetState) -> Self {
        Self {
            state,
            view: derive_view(&state),
        }
    }
}
