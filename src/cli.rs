use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::RunError;
use crate::layout::Layout;
use crate::source::SourceSpec;
use crate::util;

pub const DEFAULT_BRANCH: &str = "master";

#[derive(Parser, Debug)]
#[command(
    name = "packer-runner",
    about = "Fetch an image source, pin Packer, and run the build",
    long_about = None,
    disable_version_flag = true
)]
pub struct Cli {
  /// Source: a directory name under sources/ or a git URL
  #[arg(short = 's', long = "source", value_name = "SOURCE")]
  pub source: Option<String>,

  /// Version string exported to the build as VERSION
  #[arg(short = 'v', long = "version", value_name = "VERSION")]
  pub version: Option<String>,

  /// Branch to check out (git URL sources only; default: master)
  #[arg(short = 'b', long = "branch", value_name = "BRANCH")]
  pub branch: Option<String>,

  /// Comma-separated list of platforms (builders) to run; default: all
  #[arg(short = 'p', long = "platforms", value_name = "PLATFORMS")]
  pub platforms: Vec<String>,

  /// User data forwarded as `-var NAME=VALUE` (repeatable)
  #[arg(short = 'u', long = "user-data", value_name = "NAME=VALUE")]
  pub user_data: Vec<String>,

  /// Program root holding sources/, artifacts/ and .data/ (default: next to the executable)
  #[arg(long)]
  pub root: Option<PathBuf>,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserVar {
  pub name: String,
  pub value: String,
}

impl UserVar {
  pub fn parse(raw: &str) -> Result<UserVar, RunError> {
    match raw.split_once('=') {
      Some((name, value)) if !name.trim().is_empty() => Ok(UserVar {
        name: name.trim().to_string(),
        value: value.to_string(),
      }),
      _ => Err(RunError::usage(format!("user data {raw:?} must look like NAME=VALUE"))),
    }
  }

  pub fn as_arg(&self) -> String {
    format!("{}={}", self.name, self.value)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
  pub root: PathBuf,
  pub source: String,
  pub name: String,
  pub source_dir: PathBuf,
  pub repo_url: Option<String>,
  pub branch: String,
  pub version: String,
  pub platforms: Vec<String>,
  pub user_data: Vec<UserVar>,
}

impl BuildConfig {
  pub fn layout(&self) -> Layout {
    Layout::new(self.root.clone())
  }
}

/// Split every `-p` occurrence on commas, trimming blanks away.
pub fn normalize_platforms(raw: &[String]) -> Vec<String> {
  raw
    .iter()
    .flat_map(|s| s.split(','))
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

pub fn normalize(cli: Cli) -> Result<BuildConfig> {
  let source = match cli.source.as_deref().map(str::trim) {
    Some(s) if !s.is_empty() => s.to_string(),
    _ => return Err(RunError::usage("missing required option -s SOURCE").into()),
  };
  let version = match cli.version.as_deref().map(str::trim) {
    Some(v) if !v.is_empty() => v.to_string(),
    _ => return Err(RunError::usage("missing required option -v VERSION").into()),
  };

  let spec = SourceSpec::classify(&source)?;

  let branch = match (&spec, cli.branch) {
    (SourceSpec::Local { .. }, Some(_)) => {
      return Err(RunError::usage("-b BRANCH is only valid when -s is a git URL").into())
    }
    (_, Some(b)) if b.trim().is_empty() => return Err(RunError::usage("-b BRANCH must not be empty").into()),
    (_, Some(b)) => b.trim().to_string(),
    (_, None) => DEFAULT_BRANCH.to_string(),
  };

  let user_data = cli
    .user_data
    .iter()
    .map(|raw| UserVar::parse(raw))
    .collect::<Result<Vec<_>, _>>()?;

  let layout = match cli.root {
    Some(root) => Layout::new(util::canonicalize_lossy(root)),
    None => Layout::from_current_exe()?,
  };

  Ok(BuildConfig {
    source_dir: layout.source_dir(spec.name()),
    name: spec.name().to_string(),
    repo_url: spec.repo_url().map(str::to_string),
    root: layout.root,
    source,
    branch,
    version,
    platforms: normalize_platforms(&cli.platforms),
    user_data,
  })
}
