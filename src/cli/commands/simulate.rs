//! `simulate` command
//!
//! Replays a script of inputs against a session whose timers never wait:
//! `wait` fires the pending timer immediately. Each step prints the state
//! and view that resulted from it.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::cli::args::{ColorChoice, OutputFormat, SimulateArgs};
use crate::error::GhostboxError;
use crate::observability::events::{RunSummary, StopReason};
use crate::phase::state::Event;
use crate::phase::timer::ManualScheduler;
use crate::session::{Input, Session};
use crate::view::{Frame, RecordingView, format_styled};

use super::{load_widget_config, open_emitter, stdout_color, suggest};

const STEP_WORDS: [&str; 5] = ["click", "on", "off", "restart", "wait"];

/// Full escalation: three cycles, the one-toggle window, the ghost, and
/// whatever the terminal phase is.
pub const DEFAULT_SCRIPT: &str = "\
# three completed cycles lock the checkbox
click
click
click
click
click
click
# first lock expires
wait
# one more cycle
on
off
# second lock expires
wait
# the next click summons the ghost
click
wait
wait
";

/// One line of a simulation script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Flip the checkbox.
    Click,
    /// Set the checkbox to checked.
    On,
    /// Set the checkbox to unchecked.
    Off,
    /// Restart the widget.
    Restart,
    /// Fire the pending timer.
    Wait,
}

impl ScriptStep {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::On => "on",
            Self::Off => "off",
            Self::Restart => "restart",
            Self::Wait => "wait",
        }
    }
}

impl fmt::Display for ScriptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a script: one step per line, blank lines and `#` comments
/// skipped.
///
/// # Errors
///
/// Returns `GhostboxError::Usage` naming the first unknown line, with a
/// suggestion when one is close.
pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>, GhostboxError> {
    let mut steps = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let step = match line.to_ascii_lowercase().as_str() {
            "click" => ScriptStep::Click,
            "on" => ScriptStep::On,
            "off" => ScriptStep::Off,
            "restart" => ScriptStep::Restart,
            "wait" => ScriptStep::Wait,
            other => {
                let hint = suggest(other, &STEP_WORDS)
                    .map(|s| format!(" (did you mean '{s}'?)"))
                    .unwrap_or_default();
                return Err(GhostboxError::Usage(format!(
                    "script line {}: unknown step '{line}'{hint}",
                    idx + 1
                )));
            }
        };
        steps.push(step);
    }
    Ok(steps)
}

/// What a single step did.
#[derive(Debug, Serialize)]
struct StepRecord {
    step: usize,
    input: String,
    rendered: bool,
    #[serde(flatten)]
    frame: Frame,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    summary: RunSummary,
    elapsed_ms: u64,
}

/// Run the simulation and print every step.
///
/// # Errors
///
/// Returns a configuration error, an I/O error if the script or events
/// file cannot be opened, or a usage error for a malformed script.
pub fn run(args: &SimulateArgs, color: ColorChoice) -> Result<(), GhostboxError> {
    let config = load_widget_config(&args.widget)?;
    let steps = match &args.script {
        Some(path) => parse_script(&read_script(path)?)?,
        None => parse_script(DEFAULT_SCRIPT)?,
    };
    let emitter = open_emitter(args.events_file.as_deref())?;

    let mut session = Session::new(
        &config,
        ManualScheduler::new(config.delays),
        RecordingView::new(),
        emitter,
    );
    let printer = Printer {
        format: args.format,
        color: stdout_color(color),
    };

    printer.print(&StepRecord {
        step: 0,
        input: "start".to_string(),
        rendered: true,
        frame: Frame::from(*session.state()),
    });

    for (idx, step) in steps.iter().enumerate() {
        let rendered = apply_step(&mut session, *step);
        printer.print(&StepRecord {
            step: idx + 1,
            input: step.to_string(),
            rendered,
            frame: Frame::from(*session.state()),
        });
    }

    let summary = session.finish(StopReason::ScriptFinished);
    let elapsed = session.scheduler().elapsed();
    printer.print_summary(&SimulationReport {
        summary,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    });
    Ok(())
}

/// Applies one step; returns whether the view was redrawn.
fn apply_step(session: &mut Session<ManualScheduler, RecordingView>, step: ScriptStep) -> bool {
    let before = session.view().frames().len();
    let input = match step {
        ScriptStep::Click => Some(Input::Click),
        ScriptStep::On => Some(Input::Event(Event::Toggle(true))),
        ScriptStep::Off => Some(Input::Event(Event::Toggle(false))),
        ScriptStep::Restart => Some(Input::Event(Event::Restart)),
        ScriptStep::Wait => {
            let fired = session.scheduler_mut().fire();
            if fired.is_none() {
                tracing::warn!(phase = %session.state().phase, "wait with no timer pending");
            }
            fired.map(Input::Event)
        }
    };
    if let Some(input) = input {
        session.dispatch(input);
    }
    session.view().frames().len() > before
}

fn read_script(path: &Path) -> Result<String, GhostboxError> {
    std::fs::read_to_string(path).map_err(|e| {
        GhostboxError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read script {}: {e}", path.display()),
        ))
    })
}

struct Printer {
    format: OutputFormat,
    color: bool,
}

impl Printer {
    fn print(&self, record: &StepRecord) {
        match self.format {
            OutputFormat::Human => {
                let state = &record.frame.state;
                let marker = if record.rendered { ' ' } else { '=' };
                let line = format_styled(&record.frame.view, self.color);
                println!(
                    "{:>3} {marker} {:<8} {:<14} presses={} {line}",
                    record.step,
                    record.input,
                    state.phase.as_str(),
                    state.press_count,
                );
            }
            OutputFormat::Json => print_json(record),
        }
    }

    fn print_summary(&self, report: &SimulationReport) {
        match self.format {
            OutputFormat::Human => {
                let s = &report.summary;
                println!(
                    "final phase {} after {} inputs ({} transitions, {} ignored, {} stale timers, {} simulated)",
                    s.final_phase,
                    s.inputs,
                    s.transitions,
                    s.ignored,
                    s.stale_timers,
                    humantime::format_duration(std::time::Duration::from_millis(report.elapsed_ms)),
                );
            }
            OutputFormat::Json => print_json(report),
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!(error = %e, "failed to serialize simulation output"),
    }
}
