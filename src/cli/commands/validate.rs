//! `validate` command
//!
//! Loads each configuration file through the full loader pipeline and
//! reports the outcome per file. Every file is checked even after a
//! failure; the first failure becomes the command's error.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::loader::{ConfigLoader, LoadResult};
use crate::error::{ConfigError, GhostboxError, Severity, ValidationIssue};

/// Per-file report, printed as one JSON object per file in JSON mode.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycle_threshold: Option<u32>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

/// Validate configuration files.
///
/// # Errors
///
/// Returns the first file's configuration error, or, with `--strict`, a
/// validation error for the first file that produced warnings.
pub fn run(args: &ValidateArgs) -> Result<(), GhostboxError> {
    let loader = ConfigLoader::with_defaults();
    let mut first_failure: Option<ConfigError> = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");

        let (report, failure) = check_file(&loader, path, args.strict);
        print_report(&report, args.format);

        if let Some(err) = failure {
            first_failure.get_or_insert(err);
        }
    }

    first_failure.map_or(Ok(()), |err| Err(err.into()))
}

fn check_file(loader: &ConfigLoader, path: &Path, strict: bool) -> (FileReport, Option<ConfigError>) {
    match loader.load(path) {
        Ok(result) => {
            let failure = strict_failure(path, &result, strict);
            (passed(path, &result, failure.is_none()), failure)
        }
        Err(err) => {
            let errors = match &err {
                ConfigError::ValidationError { errors, .. } => {
                    errors.iter().map(ToString::to_string).collect()
                }
                other => vec![other.to_string()],
            };
            let report = FileReport {
                file: path.display().to_string(),
                valid: false,
                variant: None,
                cycle_threshold: None,
                warnings: Vec::new(),
                errors,
            };
            (report, Some(err))
        }
    }
}

fn passed(path: &Path, result: &LoadResult, valid: bool) -> FileReport {
    let config = &result.config;
    FileReport {
        file: path.display().to_string(),
        valid,
        variant: Some(config.variant.as_str()),
        cycle_threshold: Some(config.cycle_threshold),
        warnings: result
            .warnings
            .iter()
            .map(|w| match &w.location {
                Some(location) => format!("{} at {location}", w.message),
                None => w.message.clone(),
            })
            .collect(),
        errors: Vec::new(),
    }
}

/// With `--strict`, warnings fail the file.
fn strict_failure(path: &Path, result: &LoadResult, strict: bool) -> Option<ConfigError> {
    if !strict || result.warnings.is_empty() {
        return None;
    }
    Some(ConfigError::ValidationError {
        path: path.display().to_string(),
        errors: result
            .warnings
            .iter()
            .map(|w| ValidationIssue {
                path: w.location.clone().unwrap_or_default(),
                message: w.message.clone(),
                severity: Severity::Warning,
            })
            .collect(),
    })
}

fn print_report(report: &FileReport, format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            let status = if report.valid { "ok" } else { "FAIL" };
            println!("{status}: {}", report.file);
            for warning in &report.warnings {
                println!("  warning: {warning}");
            }
            for error in &report.errors {
                println!("  {error}");
            }
        }
        OutputFormat::Json => match serde_json::to_string(report) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize report"),
        },
    }
}
