// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Classify a -s value as a local source name or a git remote and derive the local directory name
// role: parsing/source
// inputs: Raw source identifier from the CLI
// outputs: SourceSpec { Local | Remote } with a directory name safe to join under sources/
// invariants:
// - Remote iff scheme prefix (ssh|git|http|https|ftp|ftps|rsync)://  or scp-like user@host:path
// - Remote name drops trailing '/' and '.git' and keeps the last path segment
// - Derived names are never empty, '.', '..', and never contain '/'
// errors: Usage errors for names that cannot be used as a directory
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RunError;

static RE_SCHEME: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(?:ssh|git|http|https|ftp|ftps|rsync)://[^/\s]+").unwrap());
static RE_SCP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:[^\s]*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
  Local { name: String },
  Remote { url: String, name: String },
}

impl SourceSpec {
  pub fn classify(raw: &str) -> Result<SourceSpec, RunError> {
    let raw = raw.trim();
    if raw.is_empty() {
      return Err(RunError::usage("source (-s) must not be empty"));
    }

    if is_remote(raw) {
      let name = remote_name(raw)
        .ok_or_else(|| RunError::usage(format!("cannot derive a source name from {raw:?}")))?;
      return Ok(SourceSpec::Remote { url: raw.to_string(), name });
    }

    if !is_plain_name(raw) {
      return Err(RunError::usage(format!(
        "local source {raw:?} must be a directory name under sources/, not a path"
      )));
    }
    Ok(SourceSpec::Local { name: raw.to_string() })
  }

  pub fn name(&self) -> &str {
    match self {
      SourceSpec::Local { name } | SourceSpec::Remote { name, .. } => name,
    }
  }

  pub fn repo_url(&self) -> Option<&str> {
    match self {
      SourceSpec::Local { .. } => None,
      SourceSpec::Remote { url, .. } => Some(url),
    }
  }
}

pub fn is_remote(raw: &str) -> bool {
  RE_SCHEME.is_match(raw) || RE_SCP.is_match(raw)
}

/// Last path segment of a remote URL with any trailing `/` and `.git` removed.
pub fn remote_name(url: &str) -> Option<String> {
  let trimmed = url.trim_end_matches('/');
  let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
  let tail = trimmed.rsplit(['/', ':']).next()?;
  if is_plain_name(tail) { Some(tail.to_string()) } else { None }
}

fn is_plain_name(s: &str) -> bool {
  !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\'])
}
