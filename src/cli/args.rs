//! CLI argument definitions
//!
//! All Clap derive structs for `ghostbox` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::Variant;
use crate::observability::logging::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// A checkbox that does not want to be clicked.
#[derive(Parser, Debug)]
#[command(name = "ghostbox", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "GHOSTBOX_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true, env = "GHOSTBOX_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an interactive widget on stdin with real timers.
    Run(RunArgs),

    /// Replay a scripted input sequence without waiting for timers.
    Simulate(SimulateArgs),

    /// Validate configuration files.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Widget selection shared by `run` and `simulate`.
#[derive(Args, Debug, Clone)]
pub struct WidgetArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "GHOSTBOX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Preset used when the configuration does not name one.
    #[arg(long, env = "GHOSTBOX_VARIANT")]
    pub variant: Option<Variant>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Widget selection.
    #[command(flatten)]
    pub widget: WidgetArgs,

    /// How each render is printed.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Write structured JSONL events to this file.
    #[arg(long, env = "GHOSTBOX_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,
}

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Widget selection.
    #[command(flatten)]
    pub widget: WidgetArgs,

    /// How each render is printed.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Script with one input per line (`click`, `on`, `off`, `restart`,
    /// `wait`). Defaults to the full escalation scenario.
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Write structured JSONL events to this file.
    #[arg(long, env = "GHOSTBOX_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
