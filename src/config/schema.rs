//! Configuration schema
//!
//! Two layers: the raw [`ConfigFile`] exactly as written in YAML (every
//! field optional, delays as human-readable strings), and the resolved
//! [`WidgetConfig`] the phase machine and timer scheduler consume.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::phase::machine::DEFAULT_CYCLE_THRESHOLD;
use crate::phase::state::Phase;

// ============================================================================
// Resolved configuration
// ============================================================================

/// Preset selecting one of the two known widget behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Short second lock; ends with a restart control.
    #[default]
    Canonical,
    /// Long second lock; ends greyed out for good.
    Legacy,
}

impl Variant {
    /// Returns the fully resolved configuration for this preset.
    #[must_use]
    pub const fn preset(self) -> WidgetConfig {
        match self {
            Self::Canonical => WidgetConfig {
                variant: self,
                cycle_threshold: DEFAULT_CYCLE_THRESHOLD,
                delays: TimerDelays::CANONICAL,
                terminal: TerminalPhase::Restart,
            },
            Self::Legacy => WidgetConfig {
                variant: self,
                cycle_threshold: DEFAULT_CYCLE_THRESHOLD,
                delays: TimerDelays::LEGACY,
                terminal: TerminalPhase::Greyed,
            },
        }
    }

    /// Terminal phase this preset uses.
    #[must_use]
    pub const fn terminal(self) -> TerminalPhase {
        self.preset().terminal
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::Legacy => "legacy",
        }
    }
}

/// Phase entered when the hidden phase times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TerminalPhase {
    /// Offer a restart control.
    #[default]
    Restart,
    /// Show a permanently disabled checkbox.
    Greyed,
}

impl TerminalPhase {
    /// The widget phase this choice maps to.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::Restart => Phase::Restart,
            Self::Greyed => Phase::Greyed,
        }
    }
}

impl std::str::FromStr for TerminalPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restart" => Ok(Self::Restart),
            "greyed" | "grayed" => Ok(Self::Greyed),
            other => Err(format!("unknown terminal phase '{other}'")),
        }
    }
}

/// How long each timer-driven phase lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDelays {
    /// Lock after too many cycles
    pub disabled1: Duration,
    /// Lock after the single allowed cycle
    pub disabled2: Duration,
    /// Ghost display time
    pub ghost: Duration,
    /// Blank time before the terminal phase
    pub hidden: Duration,
}

impl TimerDelays {
    /// Delays of the canonical variant.
    pub const CANONICAL: Self = Self {
        disabled1: Duration::from_millis(5000),
        disabled2: Duration::from_millis(3000),
        ghost: Duration::from_millis(1000),
        hidden: Duration::from_millis(5000),
    };

    /// Delays of the legacy variant.
    pub const LEGACY: Self = Self {
        disabled2: Duration::from_millis(10_000),
        ..Self::CANONICAL
    };

    /// Returns the delay for a timer-driven phase, `None` for any other.
    #[must_use]
    pub const fn delay_for(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Disabled1 => Some(self.disabled1),
            Phase::Disabled2 => Some(self.disabled2),
            Phase::Ghost => Some(self.ghost),
            Phase::Hidden => Some(self.hidden),
            Phase::Normal
            | Phase::OneToggle
            | Phase::GhostTrigger
            | Phase::Greyed
            | Phase::Restart => None,
        }
    }

    /// Iterates `(name, delay)` pairs in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> {
        [
            ("disabled1", self.disabled1),
            ("disabled2", self.disabled2),
            ("ghost", self.ghost),
            ("hidden", self.hidden),
        ]
        .into_iter()
    }
}

impl Default for TimerDelays {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Fully resolved widget configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Preset the configuration started from
    pub variant: Variant,
    /// Completed cycles that lock the checkbox
    pub cycle_threshold: u32,
    /// Timer-driven phase durations
    pub delays: TimerDelays,
    /// Phase after `Hidden`
    pub terminal: TerminalPhase,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Variant::Canonical.preset()
    }
}

// ============================================================================
// Raw file format
// ============================================================================

/// Top-level YAML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Widget section
    #[serde(default)]
    pub widget: WidgetSection,
}

/// The `widget:` section. Missing fields fall back to the variant preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WidgetSection {
    /// Preset to start from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,

    /// Completed cycles that lock the checkbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_threshold: Option<u32>,

    /// Phase durations as human-readable strings (`"5s"`, `"250ms"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delays: Option<DelaySection>,

    /// Phase after `Hidden`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalPhase>,
}

/// The `widget.delays:` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelaySection {
    /// `Disabled1` duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled1: Option<String>,
    /// `Disabled2` duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled2: Option<String>,
    /// `Ghost` duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghost: Option<String>,
    /// `Hidden` duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_canonical() {
        let config = WidgetConfig::default();
        assert_eq!(config.variant, Variant::Canonical);
        assert_eq!(config.cycle_threshold, 3);
        assert_eq!(config.delays.disabled2, Duration::from_secs(3));
        assert_eq!(config.terminal, TerminalPhase::Restart);
    }

    #[test]
    fn test_legacy_preset() {
        let config = Variant::Legacy.preset();
        assert_eq!(config.delays.disabled1, Duration::from_secs(5));
        assert_eq!(config.delays.disabled2, Duration::from_secs(10));
        assert_eq!(config.delays.ghost, Duration::from_secs(1));
        assert_eq!(config.delays.hidden, Duration::from_secs(5));
        assert_eq!(config.terminal, TerminalPhase::Greyed);
    }

    #[test]
    fn test_delay_for_timer_phases_only() {
        let delays = TimerDelays::CANONICAL;
        for phase in Phase::ALL {
            assert_eq!(
                delays.delay_for(phase).is_some(),
                phase.is_timer_driven(),
                "{phase}"
            );
        }
        assert_eq!(
            delays.delay_for(Phase::Ghost),
            Some(Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_terminal_phase_mapping() {
        assert_eq!(TerminalPhase::Restart.phase(), Phase::Restart);
        assert_eq!(TerminalPhase::Greyed.phase(), Phase::Greyed);
    }

    #[test]
    fn test_terminal_phase_from_str() {
        assert_eq!("restart".parse(), Ok(TerminalPhase::Restart));
        assert_eq!(" Greyed ".parse(), Ok(TerminalPhase::Greyed));
        assert_eq!("grayed".parse(), Ok(TerminalPhase::Greyed));
        assert!("gone".parse::<TerminalPhase>().is_err());
    }

    #[test]
    fn test_config_file_deserialize() {
        let yaml = r"
widget:
  variant: legacy
  cycle_threshold: 4
  delays:
    disabled2: 250ms
  terminal: restart
";
        let file: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.widget.variant, Some(Variant::Legacy));
        assert_eq!(file.widget.cycle_threshold, Some(4));
        assert_eq!(
            file.widget.delays.unwrap().disabled2.as_deref(),
            Some("250ms")
        );
        assert_eq!(file.widget.terminal, Some(TerminalPhase::Restart));
    }

    #[test]
    fn test_config_file_rejects_unknown_fields() {
        let yaml = "widget:\n  cycles: 3\n";
        assert!(serde_yaml::from_str::<ConfigFile>(yaml).is_err());
    }

    #[test]
    fn test_empty_document_is_default() {
        let file: ConfigFile = serde_yaml::from_str("{}").unwrap();
        assert!(file.widget.variant.is_none());
        assert!(file.widget.delays.is_none());
    }
}
