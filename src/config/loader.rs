//! Configuration loader
//!
//! This module implements the configuration loading pipeline:
//! 1. Size check
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing
//! 4. Preset resolution and duration parsing
//! 5. Environment overrides
//! 6. Validation

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{ConfigFile, DelaySection, TerminalPhase, Variant, WidgetConfig};
use crate::config::validation::Validator;
use crate::error::{ConfigError, Severity};

/// Overrides the cycle threshold after parsing.
pub const ENV_CYCLE_THRESHOLD: &str = "GHOSTBOX_CYCLE_THRESHOLD";
/// Overrides the terminal phase after parsing.
pub const ENV_TERMINAL: &str = "GHOSTBOX_TERMINAL";
/// Overrides the second lock duration after parsing.
pub const ENV_DISABLED2_DELAY: &str = "GHOSTBOX_DISABLED2_DELAY";
/// Overrides the maximum configuration file size, in bytes.
pub const ENV_MAX_CONFIG_SIZE: &str = "GHOSTBOX_MAX_CONFIG_SIZE";

/// Default maximum configuration file size.
pub const DEFAULT_MAX_CONFIG_SIZE: u64 = 64 * 1024;

const DURATION_EXPECTED: &str = "a duration such as 5s or 250ms";

// ============================================================================
// Public API
// ============================================================================

/// Source of environment variables, swappable for tests.
#[derive(Clone)]
pub struct EnvSource(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl EnvSource {
    /// Reads from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self(Arc::new(|name| std::env::var(name).ok()))
    }

    /// Reads from a fixed map.
    #[must_use]
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self(Arc::new(move |name| vars.get(name).cloned()))
    }

    /// Reads nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::new(|_| None))
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
    }
}

impl fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSource").finish_non_exhaustive()
    }
}

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Preset used when the file does not name a variant.
    pub default_variant: Variant,

    /// Limits for configuration size.
    pub config_limits: ConfigLimits,

    /// Where `${VAR}` references and `GHOSTBOX_*` overrides are read from.
    pub env: EnvSource,
}

impl LoaderOptions {
    /// Default options reading every environment setting from `env`.
    #[must_use]
    pub fn with_env(env: EnvSource) -> Self {
        Self {
            default_variant: Variant::default(),
            config_limits: ConfigLimits::from_env(&env),
            env,
        }
    }
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::with_env(EnvSource::process())
    }
}

/// Limits for configuration size.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: u64,
}

impl ConfigLimits {
    /// Default limits, with `GHOSTBOX_MAX_CONFIG_SIZE` applied when it
    /// parses.
    #[must_use]
    pub fn from_env(env: &EnvSource) -> Self {
        let max_config_size = env
            .get(ENV_MAX_CONFIG_SIZE)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_CONFIG_SIZE);
        Self { max_config_size }
    }
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: DEFAULT_MAX_CONFIG_SIZE,
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: WidgetConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, references an
    /// unset environment variable, is not valid YAML, contains an
    /// unparseable duration, or fails validation.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        if metadata.len() > limit {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: e.to_string(),
        })?;

        self.load_str(&raw, path)
    }

    /// Loads configuration from in-memory YAML text.
    ///
    /// `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file checks.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let expanded = expand_env_vars(raw, &self.options.env)?;
        let file = parse_document(&expanded, origin)?;
        let config = self.resolve(&file)?;
        let config = self.apply_env_overrides(config)?;

        let issues = Validator::new().validate(&config, &file);
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|issue| issue.severity == Severity::Error);

        if !errors.is_empty() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors,
            });
        }

        tracing::debug!(
            origin = %origin.display(),
            variant = config.variant.as_str(),
            threshold = config.cycle_threshold,
            "configuration loaded"
        );

        Ok(LoadResult {
            config,
            warnings: warnings
                .into_iter()
                .map(|issue| LoadWarning {
                    message: issue.message,
                    location: Some(issue.path),
                })
                .collect(),
        })
    }

    /// Resolves the raw document against its variant preset.
    fn resolve(&self, file: &ConfigFile) -> Result<WidgetConfig, ConfigError> {
        let section = &file.widget;
        let variant = section.variant.unwrap_or(self.options.default_variant);
        let mut config = variant.preset();

        if let Some(threshold) = section.cycle_threshold {
            config.cycle_threshold = threshold;
        }
        if let Some(terminal) = section.terminal {
            config.terminal = terminal;
        }
        if let Some(delays) = &section.delays {
            apply_delays(&mut config, delays)?;
        }

        Ok(config)
    }

    /// Applies `GHOSTBOX_*` overrides on top of the resolved file.
    fn apply_env_overrides(&self, mut config: WidgetConfig) -> Result<WidgetConfig, ConfigError> {
        let env = &self.options.env;

        if let Some(value) = env.get(ENV_CYCLE_THRESHOLD) {
            config.cycle_threshold =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: ENV_CYCLE_THRESHOLD.to_string(),
                        value: value.clone(),
                        expected: "a non-negative integer".to_string(),
                    })?;
        }

        if let Some(value) = env.get(ENV_TERMINAL) {
            config.terminal =
                value
                    .parse::<TerminalPhase>()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: ENV_TERMINAL.to_string(),
                        value: value.clone(),
                        expected: "'restart' or 'greyed'".to_string(),
                    })?;
        }

        if let Some(value) = env.get(ENV_DISABLED2_DELAY) {
            config.delays.disabled2 = parse_delay(ENV_DISABLED2_DELAY, &value)?;
        }

        Ok(config)
    }
}

// ============================================================================
// Pipeline steps
// ============================================================================

fn parse_document(text: &str, origin: &Path) -> Result<ConfigFile, ConfigError> {
    if text.trim().is_empty() {
        return Ok(ConfigFile::default());
    }

    serde_yaml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: PathBuf::from(origin),
        line: e.location().map(|loc| loc.line()),
        message: e.to_string(),
    })
}

fn apply_delays(config: &mut WidgetConfig, delays: &DelaySection) -> Result<(), ConfigError> {
    let slots = [
        ("widget.delays.disabled1", &delays.disabled1, &mut config.delays.disabled1),
        ("widget.delays.disabled2", &delays.disabled2, &mut config.delays.disabled2),
        ("widget.delays.ghost", &delays.ghost, &mut config.delays.ghost),
        ("widget.delays.hidden", &delays.hidden, &mut config.delays.hidden),
    ];

    for (field, raw, slot) in slots {
        if let Some(raw) = raw {
            *slot = parse_delay(field, raw)?;
        }
    }
    Ok(())
}

/// Parses a human-readable delay (`"5s"`, `"250ms"`, `"1m 30s"`).
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` naming `field` if the text is not a
/// duration.
pub fn parse_delay(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        expected: DURATION_EXPECTED.to_string(),
    })
}

/// Expands `${VAR}` and `${VAR:-default}` references.
///
/// `$$` escapes a literal dollar sign.
fn expand_env_vars(text: &str, env: &EnvSource) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];

        if let Some(after) = tail.strip_prefix("$$") {
            out.push('$');
            rest = after;
            continue;
        }

        let Some(body_start) = tail.strip_prefix("${") else {
            out.push('$');
            rest = &tail[1..];
            continue;
        };

        let Some(end) = body_start.find('}') else {
            // Unterminated reference: keep it verbatim and let YAML complain.
            out.push_str(tail);
            rest = "";
            break;
        };

        let body = &body_start[..end];
        let (name, default) = match body.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };

        match env.get(name).or_else(|| default.map(str::to_string)) {
            Some(value) => out.push_str(&value),
            None => {
                let consumed = text.len() - tail.len();
                let line = text[..consumed].matches('\n').count() + 1;
                return Err(ConfigError::EnvVarNotSet {
                    var: name.to_string(),
                    location: format!("line {line}"),
                });
            }
        }

        rest = &body_start[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
