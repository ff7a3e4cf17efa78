//! Shared integration-test harness for running the `ghostbox` binary.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

/// Default timeout for reading one line from the child.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs `ghostbox` to completion with the given arguments.
///
/// `GHOSTBOX_*` overrides from the outer environment are cleared so
/// fixtures behave the same everywhere.
#[allow(clippy::missing_panics_doc)]
pub fn run_command(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_ghostbox"))
        .args(args)
        .env_remove("GHOSTBOX_CYCLE_THRESHOLD")
        .env_remove("GHOSTBOX_TERMINAL")
        .env_remove("GHOSTBOX_DISABLED2_DELAY")
        .env_remove("GHOSTBOX_CONFIG")
        .env_remove("GHOSTBOX_VARIANT")
        .env("NO_COLOR", "1")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run ghostbox")
}

/// Stdout of a finished command, as text.
pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Parses every stdout line as JSON.
#[allow(clippy::missing_panics_doc)]
pub fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    stdout_of(output)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("stdout line is not JSON"))
        .collect()
}

/// An interactive `ghostbox run` child with piped stdio.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
pub struct GhostboxProcess {
    child: Child,
    stdin: Option<tokio::process::ChildStdin>,
    reader: BufReader<tokio::process::ChildStdout>,
}

impl GhostboxProcess {
    /// Spawns `ghostbox run --format json` with a configuration file.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn(config_path: &Path, extra: &[&str]) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_ghostbox"))
            .args([
                "run",
                "--format",
                "json",
                "--quiet",
                "--config",
                config_path.to_str().expect("non-UTF-8 config path"),
            ])
            .args(extra)
            .env_remove("GHOSTBOX_CYCLE_THRESHOLD")
            .env_remove("GHOSTBOX_TERMINAL")
            .env_remove("GHOSTBOX_DISABLED2_DELAY")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn ghostbox");

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        Self {
            child,
            stdin: Some(stdin),
            reader: BufReader::new(stdout),
        }
    }

    /// Writes one command line to the child's stdin.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write to stdin");
        stdin.flush().await.expect("flush stdin");
    }

    /// Reads the next rendered view.
    ///
    /// Panics on EOF or if nothing arrives within `timeout`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_view(&mut self, timeout: Duration) -> serde_json::Value {
        let mut line = String::new();
        tokio::time::timeout(timeout, async {
            loop {
                line.clear();
                let n = self
                    .reader
                    .read_line(&mut line)
                    .await
                    .expect("read_line I/O error");
                assert!(n > 0, "unexpected EOF from ghostbox");
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return serde_json::from_str(trimmed).expect("view line is not JSON");
                }
            }
        })
        .await
        .expect("timed out waiting for a view")
    }

    /// Closes stdin and waits for the child to exit.
    #[allow(clippy::missing_panics_doc)]
    pub async fn finish(mut self) -> std::process::ExitStatus {
        drop(self.stdin.take());
        tokio::time::timeout(DEFAULT_TIMEOUT, self.child.wait())
            .await
            .expect("ghostbox did not exit")
            .expect("wait for ghostbox")
    }
}
