// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed failure kinds that callers (main, tests) need to tell apart from plain anyhow context
// role: errors/types
// outputs: RunError enum; wrapped into anyhow::Error at the failure site
// invariants: Every variant maps to exit code 1; messages are single-line and user-facing
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
  #[error("{0}")]
  Usage(String),

  #[error("template descriptor not found: {}", .0.display())]
  MissingTemplate(PathBuf),

  #[error("hook `{hook}` exited with status {code}")]
  HookFailed { hook: String, code: i32 },

  #[error("packer exited with status {code}")]
  BuilderFailed { code: i32 },

  #[error("installed packer reports version {found:?}, expected {expected}")]
  ToolVersionMismatch { expected: String, found: Option<String> },
}

impl RunError {
  pub fn usage(msg: impl Into<String>) -> Self {
    RunError::Usage(msg.into())
  }
}

/// Exit code of a finished child, `-1` when it was killed by a signal.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
  status.code().unwrap_or(-1)
}
