// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for paths, subprocess invocation, and man page rendering
// role: utilities/helpers
// inputs: Paths; program + args + working directory; clap CommandFactory
// outputs: Canonicalized paths, captured stdout, man page text
// side_effects: run_cmd/run_git/run_teed invoke subprocesses; run_teed writes child output to the run log
// invariants:
// - Subprocesses always get an explicit working directory; the process cwd is never changed
// - A non-zero exit is an error carrying the command line and stderr
// errors: run_cmd surfaces command + stderr; IO errors bubble with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use clap::CommandFactory;

use crate::logger::{Logger, Stream};

pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> PathBuf {
  let p = p.as_ref();
  match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => PathBuf::from(p),
    },
  }
}

/// Run `program args...` in `dir`, returning stdout on success.
pub fn run_cmd<P: AsRef<OsStr>, S: AsRef<OsStr>>(program: P, args: &[S], dir: &Path) -> Result<String> {
  let program = program.as_ref();
  let shown = format!("{} {}", program.to_string_lossy(), display_args(args));
  let out = Command::new(program)
    .args(args)
    .current_dir(dir)
    .output()
    .with_context(|| format!("spawning {}", shown))?;

  if out.status.success() {
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
  } else {
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::bail!("{} failed ({}): {}", shown, out.status, stderr.trim())
  }
}

pub fn run_git<S: AsRef<OsStr>>(repo: &Path, args: &[S]) -> Result<String> {
  run_cmd("git", args, repo)
}

/// Run `cmd` to completion, passing every stdout/stderr line through the logger.
///
/// Both pipes are drained concurrently so a chatty stderr cannot stall the child.
/// The exit status is returned unchecked; callers decide what a failure means.
pub fn run_teed(cmd: &mut Command, log: &Logger) -> Result<ExitStatus> {
  let program = cmd.get_program().to_string_lossy().into_owned();
  let mut child = cmd
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .with_context(|| format!("spawning {}", program))?;

  let stdout = child.stdout.take();
  let stderr = child.stderr.take();
  std::thread::scope(|s| {
    if let Some(out) = stdout {
      s.spawn(|| pump(out, Stream::Stdout, log));
    }
    if let Some(err) = stderr {
      s.spawn(|| pump(err, Stream::Stderr, log));
    }
  });

  child.wait().with_context(|| format!("waiting for {}", program))
}

/// Copy `reader` to the log a line at a time until EOF.
///
/// Bytes that are not UTF-8 are replaced rather than ending the copy. After a
/// read error the rest of the pipe is discarded so the child never sees EPIPE.
fn pump<R: Read>(reader: R, stream: Stream, log: &Logger) {
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();
  loop {
    buf.clear();
    match reader.read_until(b'\n', &mut buf) {
      Ok(0) => return,
      Ok(_) => {
        let line = String::from_utf8_lossy(&buf);
        log.output(stream, line.trim_end_matches(['\n', '\r']));
      }
      Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
      Err(_) => break,
    }
  }
  let _ = std::io::copy(&mut reader, &mut std::io::sink());
}

fn display_args<S: AsRef<OsStr>>(args: &[S]) -> String {
  args
    .iter()
    .map(|a| a.as_ref().to_string_lossy().into_owned())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
