//! Structured event stream for `ghostbox`.
//!
//! Discrete, typed events emitted while a widget session runs. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::phase::state::Phase;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a widget session.
///
/// Serialized with a `"type"` tag so consumers can dispatch on the kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A session has started.
    SessionStarted {
        /// When the session started.
        timestamp: DateTime<Utc>,
        /// Random session identifier.
        session_id: String,
        /// Configured variant name.
        variant: String,
        /// Configured cycle threshold.
        cycle_threshold: u32,
    },

    /// A phase was entered (including `normal` after a restart).
    PhaseEntered {
        /// When the transition happened.
        timestamp: DateTime<Utc>,
        /// Phase left.
        from: Phase,
        /// Phase entered.
        phase: Phase,
        /// Cycle count after the transition.
        press_count: u32,
    },

    /// A timer was armed on phase entry.
    TimerArmed {
        /// When the timer was armed.
        timestamp: DateTime<Utc>,
        /// Phase the timer belongs to.
        phase: Phase,
        /// Delay in milliseconds.
        delay_ms: u64,
    },

    /// Input was dropped because the widget is inert.
    InputIgnored {
        /// When the input arrived.
        timestamp: DateTime<Utc>,
        /// Phase that dropped it.
        phase: Phase,
        /// Human-readable input description.
        input: String,
    },

    /// A timer fired for a phase the widget already left.
    StaleTimerDiscarded {
        /// When the timer event was processed.
        timestamp: DateTime<Utc>,
        /// Phase the timer was armed for.
        expected: Phase,
        /// Phase the widget was in.
        current: Phase,
    },

    /// The session has stopped.
    SessionStopped {
        /// When the session stopped.
        timestamp: DateTime<Utc>,
        /// Why it stopped.
        reason: StopReason,
        /// Summary of the session.
        summary: RunSummary,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Input source was exhausted.
    InputClosed,
    /// The user asked to quit.
    UserQuit,
    /// A shutdown signal arrived.
    Cancelled,
    /// A scripted run reached its end.
    ScriptFinished,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InputClosed => "input closed",
            Self::UserQuit => "user quit",
            Self::Cancelled => "cancelled",
            Self::ScriptFinished => "script finished",
        })
    }
}

/// Counters collected over a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    /// Inputs processed (user and timer).
    pub inputs: u64,
    /// Phase entries, restarts included.
    pub transitions: u64,
    /// Inputs dropped by an inert phase.
    pub ignored: u64,
    /// Stale timer events discarded.
    pub stale_timers: u64,
    /// Phase at the end of the session.
    pub final_phase: Phase,
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as a single JSON line and flushes. Serialization
/// or I/O failures are dropped; observability never stops the widget.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::noop()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_event() -> Event {
        Event::PhaseEntered {
            timestamp: DateTime::parse_from_rfc3339("2026-10-19T10:15:30Z")
                .unwrap()
                .with_timezone(&Utc),
            from: Phase::Normal,
            phase: Phase::Disabled1,
            press_count: 3,
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "PhaseEntered");
        assert_eq!(parsed["phase"], "disabled1");
        assert_eq!(parsed["press_count"], 3);
    }

    #[test]
    fn test_emitter_writes_flat_jsonl_with_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_event());
        emitter.emit(Event::StaleTimerDiscarded {
            timestamp: Utc::now(),
            expected: Phase::Ghost,
            current: Phase::Normal,
        });

        assert_eq!(emitter.event_count(), 2);

        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[0]["type"], "PhaseEntered");
        assert!(lines[0].get("event").is_none());
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["expected"], "ghost");
    }

    #[test]
    fn test_session_stopped_embeds_summary() {
        let event = Event::SessionStopped {
            timestamp: Utc::now(),
            reason: StopReason::ScriptFinished,
            summary: RunSummary {
                inputs: 12,
                transitions: 8,
                ignored: 1,
                stale_timers: 0,
                final_phase: Phase::Restart,
            },
        };
        let parsed = serde_json::to_value(&event).unwrap();
        assert_eq!(parsed["reason"], "script_finished");
        assert_eq!(parsed["summary"]["final_phase"], "restart");
        assert_eq!(parsed["summary"]["transitions"], 8);
    }

    #[test]
    fn test_noop_emitter_counts() {
        let emitter = EventEmitter::noop();
        emitter.emit(sample_event());
        assert_eq!(emitter.event_count(), 1);
    }
}
