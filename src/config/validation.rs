//! Configuration validation
//!
//! Checks a resolved [`WidgetConfig`] for values the phase machine cannot
//! use, and flags combinations that are legal but probably unintended.

use std::time::Duration;

use crate::config::loader::ENV_TERMINAL;
use crate::config::schema::{ConfigFile, TerminalPhase, Variant, WidgetConfig};
use crate::error::{Severity, ValidationIssue};

/// Delays above this are accepted with a warning.
pub const LONG_DELAY_WARNING: Duration = Duration::from_secs(60 * 60);

/// Validates resolved widget configurations.
#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a validator with no recorded issues.
    #[must_use]
    pub const fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Validates `config`, using `file` to tell explicit settings from
    /// preset defaults. Returns every issue found, errors and warnings.
    #[must_use]
    pub fn validate(mut self, config: &WidgetConfig, file: &ConfigFile) -> Vec<ValidationIssue> {
        self.check_threshold(config);
        self.check_delays(config);
        self.check_variant_mix(config, file);
        self.issues
    }

    fn check_threshold(&mut self, config: &WidgetConfig) {
        if config.cycle_threshold == 0 {
            self.error("widget.cycle_threshold", "cycle threshold must be at least 1");
        }
    }

    fn check_delays(&mut self, config: &WidgetConfig) {
        for (name, delay) in config.delays.iter() {
            let path = format!("widget.delays.{name}");
            if delay.is_zero() {
                self.error(&path, "delay must be greater than zero");
            } else if delay > LONG_DELAY_WARNING {
                self.warning(
                    &path,
                    &format!(
                        "delay of {} is unusually long",
                        humantime::format_duration(delay)
                    ),
                );
            }
        }
    }

    fn check_variant_mix(&mut self, config: &WidgetConfig, file: &ConfigFile) {
        if config.terminal == config.variant.terminal() {
            return;
        }
        // Without a file setting, only the environment can have changed it.
        let path = if file.widget.terminal.is_some() {
            "widget.terminal"
        } else {
            ENV_TERMINAL
        };

        let message = match (config.variant, config.terminal) {
            (Variant::Legacy, TerminalPhase::Restart) => {
                "legacy variant normally ends greyed; restart terminal mixes variants"
            }
            (Variant::Canonical, TerminalPhase::Greyed) => {
                "canonical variant normally ends with restart; greyed terminal mixes variants"
            }
            _ => return,
        };
        self.warning(path, message);
    }

    fn error(&mut self, path: &str, message: &str) {
        self.push(path, message, Severity::Error);
    }

    fn warning(&mut self, path: &str, message: &str) {
        self.push(path, message, Severity::Warning);
    }

    fn push(&mut self, path: &str, message: &str, severity: Severity) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity,
        });
    }
}
