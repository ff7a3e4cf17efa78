//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod run;
pub mod simulate;
pub mod validate;
pub mod version;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, ColorChoice, Commands, WidgetArgs};
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::config::schema::WidgetConfig;
use crate::error::GhostboxError;
use crate::observability::events::EventEmitter;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), GhostboxError> {
    let color = cli.color;
    match cli.command {
        Commands::Run(args) => run::run(&args, color, cancel).await,
        Commands::Simulate(args) => simulate::run(&args, color),
        Commands::Validate(args) => validate::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Resolves the widget configuration for `run` and `simulate`.
///
/// Without `--config` the selected preset is used as is, with the same
/// `GHOSTBOX_*` environment overrides a file would get.
fn load_widget_config(args: &WidgetArgs) -> Result<WidgetConfig, GhostboxError> {
    let mut options = LoaderOptions::default();
    if let Some(variant) = args.variant {
        options.default_variant = variant;
    }
    let loader = ConfigLoader::new(options);

    let result = match &args.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            loader.load(path)?
        }
        None => loader.load_str("", Path::new("<preset>"))?,
    };

    for warning in &result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    Ok(result.config)
}

/// Opens the event sink: the given file, or nowhere.
fn open_emitter(path: Option<&Path>) -> Result<Arc<EventEmitter>, GhostboxError> {
    let emitter = match path {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };
    Ok(Arc::new(emitter))
}

/// Suggests the closest known word for a typo.
///
/// Returns the best match if its Damerau-Levenshtein distance is at most 2.
fn suggest<'a>(input: &str, known: &[&'a str]) -> Option<&'a str> {
    known
        .iter()
        .map(|word| (*word, strsim::damerau_levenshtein(input, word)))
        .filter(|(_, dist)| *dist <= 2)
        .min_by_key(|(_, dist)| *dist)
        .map(|(word, _)| word)
}

/// Resolves whether ANSI colors should be used on stdout.
fn stdout_color(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Auto => {
            std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}
