//! `run` command
//!
//! Interactive widget on stdin. Timers are real: the session and its
//! tokio scheduler share one input channel, and a reader task turns stdin
//! lines into inputs.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::args::{ColorChoice, OutputFormat, RunArgs};
use crate::config::schema::WidgetConfig;
use crate::error::GhostboxError;
use crate::observability::events::{EventEmitter, RunSummary};
use crate::phase::state::Event;
use crate::phase::timer::TokioTimerScheduler;
use crate::session::{Input, Session};
use crate::view::{JsonView, TerminalView, View};

use super::{load_widget_config, open_emitter, stdout_color, suggest};

const COMMAND_WORDS: [&str; 7] = ["click", "on", "off", "restart", "status", "quit", "help"];

const HELP: &str = "\
commands:
  click, c, <enter>   click the checkbox
  on / off            set the checkbox
  restart, r          restart the widget
  status, s           redraw the widget
  quit, q             exit";

/// A parsed stdin line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Forward to the session.
    Input(Input),
    /// Print the command list.
    Help,
}

/// Parses one line of interactive input.
///
/// # Errors
///
/// Returns a message for unknown commands, with a suggestion when one is
/// close.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let word = line.trim().to_ascii_lowercase();
    let input = match word.as_str() {
        "" | "c" | "click" => Input::Click,
        "on" => Input::Event(Event::Toggle(true)),
        "off" => Input::Event(Event::Toggle(false)),
        "r" | "restart" => Input::Event(Event::Restart),
        "s" | "status" => Input::Refresh,
        "q" | "quit" | "exit" => Input::Quit,
        "h" | "help" | "?" => return Ok(Command::Help),
        other => {
            let hint = suggest(other, &COMMAND_WORDS)
                .map(|s| format!("; did you mean '{s}'?"))
                .unwrap_or_default();
            return Err(format!("unknown command '{other}'{hint} (try 'help')"));
        }
    };
    Ok(Command::Input(input))
}

/// Run an interactive session until `quit`, end of input, or `cancel`.
///
/// # Errors
///
/// Returns a configuration error, or an I/O error if the events file
/// cannot be created.
pub async fn run(
    args: &RunArgs,
    color: ColorChoice,
    cancel: CancellationToken,
) -> Result<(), GhostboxError> {
    let config = load_widget_config(&args.widget)?;
    let emitter = open_emitter(args.events_file.as_deref())?;

    let summary = match args.format {
        OutputFormat::Human => {
            let view = TerminalView::stdout().with_color(stdout_color(color));
            drive(&config, view, emitter, cancel).await
        }
        OutputFormat::Json => {
            let view = JsonView::new(std::io::stdout());
            drive(&config, view, emitter, cancel).await
        }
    };

    tracing::debug!(?summary, "interactive session finished");
    Ok(())
}

async fn drive<V: View>(
    config: &WidgetConfig,
    view: V,
    emitter: Arc<EventEmitter>,
    cancel: CancellationToken,
) -> RunSummary {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = TokioTimerScheduler::new(config.delays, tx.clone());
    let mut session = Session::new(config, scheduler, view, emitter);

    let reader_cancel = cancel.child_token();
    let reader = tokio::spawn(read_stdin(tx, reader_cancel.clone()));

    let summary = session.run(&mut rx, cancel).await;

    reader_cancel.cancel();
    reader.abort();
    summary
}

/// Forwards stdin commands until `quit`, end of input, or cancellation.
async fn read_stdin(tx: mpsc::UnboundedSender<Input>, cancel: CancellationToken) {
    forward_commands(tokio::io::stdin(), tx, cancel).await;
}

/// Forwards one command per line. End of input and read errors send
/// [`Input::Closed`]; `quit` is forwarded and ends reading.
async fn forward_commands<R>(
    reader: R,
    tx: mpsc::UnboundedSender<Input>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("stdin closed");
                let _ = tx.send(Input::Closed);
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                let _ = tx.send(Input::Closed);
                return;
            }
        };

        match parse_command(&line) {
            Ok(Command::Input(input)) => {
                if tx.send(input).is_err() || input == Input::Quit {
                    return;
                }
            }
            Ok(Command::Help) => eprintln!("{HELP}"),
            Err(message) => eprintln!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_click_aliases() {
        for line in ["", "  ", "c", "click", "CLICK"] {
            assert_eq!(parse_command(line), Ok(Command::Input(Input::Click)), "{line:?}");
        }
    }

    #[test]
    fn test_parse_values_and_restart() {
        assert_eq!(
            parse_command("on"),
            Ok(Command::Input(Input::Event(Event::Toggle(true))))
        );
        assert_eq!(
            parse_command("off"),
            Ok(Command::Input(Input::Event(Event::Toggle(false))))
        );
        assert_eq!(
            parse_command("r"),
            Ok(Command::Input(Input::Event(Event::Restart)))
        );
    }

    #[test]
    fn test_parse_session_control() {
        assert_eq!(parse_command("status"), Ok(Command::Input(Input::Refresh)));
        assert_eq!(parse_command("q"), Ok(Command::Input(Input::Quit)));
        assert_eq!(parse_command("help"), Ok(Command::Help));
    }

    async fn forwarded(input: &'static [u8]) -> Vec<Input> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_commands(input, tx, CancellationToken::new()).await;
        let mut inputs = Vec::new();
        while let Some(input) = rx.recv().await {
            inputs.push(input);
        }
        inputs
    }

    #[tokio::test]
    async fn test_end_of_input_sends_closed() {
        let inputs = forwarded(b"on\nbogus\nstatus\n").await;
        assert_eq!(
            inputs,
            vec![
                Input::Event(Event::Toggle(true)),
                Input::Refresh,
                Input::Closed,
            ]
        );
    }

    #[tokio::test]
    async fn test_quit_stops_reading() {
        let inputs = forwarded(b"click\nquit\nclick\n").await;
        assert_eq!(inputs, vec![Input::Click, Input::Quit]);
    }

    #[test]
    fn test_parse_unknown_suggests() {
        let err = parse_command("restrat").unwrap_err();
        assert!(err.contains("did you mean 'restart'"), "{err}");

        let err = parse_command("xyzzy").unwrap_err();
        assert!(!err.contains("did you mean"), "{err}");
    }
}
