// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Per-run log: truncated .data/run.log with timestamped lines, mirrored to the terminal in color
// role: logging
// inputs: Log file path; messages from every pipeline step; raw builder output lines
// outputs: Lines in run.log; colored status lines on stderr; passthrough lines on stdout/stderr
// side_effects: Creates/truncates the log file on construction; appends on every call
// invariants:
// - One Logger per run, passed by reference; no global state
// - Log file writes never fail the run (best-effort), terminal writes likewise
// - File lines are "<timestamp> <LEVEL> <message>"
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Info,
  Error,
  Output,
}

impl Level {
  fn label(self) -> &'static str {
    match self {
      Level::Info => "INFO",
      Level::Error => "ERROR",
      Level::Output => "OUT",
    }
  }
}

/// Which terminal stream a passthrough line belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
  Stdout,
  Stderr,
}

pub struct Logger {
  path: PathBuf,
  file: Mutex<File>,
}

impl Logger {
  /// Open (and truncate) the run log, creating its parent directory.
  pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    Ok(Logger { path: path.to_path_buf(), file: Mutex::new(file) })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn info(&self, msg: impl AsRef<str>) {
    let msg = msg.as_ref();
    let _ = writeln!(anstream::stderr(), "{} {}", "==>".green().bold(), msg.green());
    self.record(Level::Info, msg);
  }

  pub fn error(&self, msg: impl AsRef<str>) {
    let msg = msg.as_ref();
    let _ = writeln!(anstream::stderr(), "{} {}", "!!!".red().bold(), msg.red());
    self.record(Level::Error, msg);
  }

  /// Pass a line of child output through to the terminal and the log.
  pub fn output(&self, stream: Stream, line: &str) {
    match stream {
      Stream::Stdout => {
        let _ = writeln!(anstream::stdout(), "{line}");
      }
      Stream::Stderr => {
        let _ = writeln!(anstream::stderr(), "{line}");
      }
    }
    self.record(Level::Output, line);
  }

  /// Append to the log file only.
  pub fn record(&self, level: Level, msg: &str) {
    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    if let Ok(mut f) = self.file.lock() {
      for line in msg.lines() {
        let _ = writeln!(f, "{} {:<5} {}", stamp, level.label(), line);
      }
    }
  }
}
