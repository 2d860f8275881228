// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Make sure the pinned Packer version is installed under .data/packer, downloading and unzipping it when needed
// role: provisioning/installer
// inputs: Layout, Settings (packer_version, download_base, arch); ToolSource for download/extract; Logger
// outputs: InstallOutcome describing what was done
// side_effects: Removes/recreates .data/packer; writes the release zip into .data/cache; spawns `packer version` and `unzip`
// invariants:
// - Installed version == target => no filesystem change (idempotent fast path)
// - A cached archive with the expected file name is never downloaded again
// - Downloads land in <archive>.part and are renamed only once complete
// - After install the probed version must equal the target
// errors: Directory, download, extraction failures and a post-install mismatch are fatal
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RunError;
use crate::layout::Layout;
use crate::logger::Logger;
use crate::settings::Settings;
use crate::util::run_cmd;

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bv?(\d+\.\d+\.\d+[0-9A-Za-z.+-]*)").unwrap());

/// Where release archives come from and how they are unpacked.
pub trait ToolSource {
  fn download(&self, url: &str, dest: &Path) -> Result<()>;
  fn extract(&self, archive: &Path, into: &Path) -> Result<()>;
}

/// Releases over HTTP(S) with `ureq`, unpacked by the system `unzip`.
pub struct ReleaseSource {
  agent: ureq::Agent,
}

impl ReleaseSource {
  pub fn new() -> Self {
    Self { agent: ureq::AgentBuilder::new().user_agent("packer-runner").build() }
  }
}

impl ReleaseSource {
  /// Stream `url` into `part`, failing if the body is shorter than Content-Length.
  fn fetch_to(&self, url: &str, part: &Path) -> Result<()> {
    let resp = self.agent.get(url).call().with_context(|| format!("downloading {}", url))?;
    let expected: Option<u64> = resp.header("Content-Length").and_then(|v| v.trim().parse().ok());

    let mut file = File::create(part).with_context(|| format!("creating {}", part.display()))?;
    let copied = std::io::copy(&mut resp.into_reader(), &mut file)
      .with_context(|| format!("writing {}", part.display()))?;
    if let Some(len) = expected {
      if copied != len {
        anyhow::bail!("downloading {}: got {} of {} bytes", url, copied, len);
      }
    }
    file.sync_all().with_context(|| format!("flushing {}", part.display()))?;
    Ok(())
  }
}

impl Default for ReleaseSource {
  fn default() -> Self {
    Self::new()
  }
}

impl ToolSource for ReleaseSource {
  fn download(&self, url: &str, dest: &Path) -> Result<()> {
    let part = dest.with_extension("zip.part");
    let done = self
      .fetch_to(url, &part)
      .and_then(|()| std::fs::rename(&part, dest).with_context(|| format!("moving {} into place", part.display())));
    if done.is_err() {
      let _ = std::fs::remove_file(&part);
    }
    done
  }

  fn extract(&self, archive: &Path, into: &Path) -> Result<()> {
    let args: [&OsStr; 5] = [OsStr::new("-o"), OsStr::new("-q"), archive.as_os_str(), OsStr::new("-d"), into.as_os_str()];
    run_cmd("unzip", &args, into)?;
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolState {
  pub installed: Option<String>,
  pub target: String,
}

impl ToolState {
  pub fn probe(layout: &Layout, settings: &Settings) -> Self {
    ToolState { installed: installed_version(&layout.packer_bin()), target: settings.packer_version.clone() }
  }

  pub fn is_current(&self) -> bool {
    self.installed.as_deref() == Some(self.target.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
  AlreadyCurrent,
  Installed { downloaded: bool },
}

/// Version reported by `<bin> version`, if the binary exists and answers.
pub fn installed_version(bin: &Path) -> Option<String> {
  if !bin.is_file() {
    return None;
  }
  let dir = bin.parent()?;
  let out = run_cmd(bin, &["version"], dir).ok()?;
  parse_version(&out)
}

pub fn parse_version(text: &str) -> Option<String> {
  RE_VERSION.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Lower-cased kernel name as used in release file names.
pub fn kernel_name() -> &'static str {
  match std::env::consts::OS {
    "macos" => "darwin",
    other => other,
  }
}

pub fn archive_name(version: &str, os: &str, arch: &str) -> String {
  format!("packer_{}_{}_{}.zip", version, os, arch)
}

pub fn download_url(settings: &Settings, os: &str) -> String {
  let v = &settings.packer_version;
  format!(
    "{}/{}/{}",
    settings.download_base.trim_end_matches('/'),
    v,
    archive_name(v, os, &settings.arch)
  )
}

pub fn ensure_packer(
  layout: &Layout,
  settings: &Settings,
  source: &dyn ToolSource,
  log: &Logger,
) -> Result<InstallOutcome> {
  let state = ToolState::probe(layout, settings);
  if state.is_current() {
    log.info(format!("Packer {} already installed", state.target));
    return Ok(InstallOutcome::AlreadyCurrent);
  }

  match &state.installed {
    Some(found) => log.info(format!("Replacing Packer {} with {}", found, state.target)),
    None => log.info(format!("Installing Packer {}", state.target)),
  }

  let dir = layout.packer_dir();
  if dir.exists() {
    std::fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
  }
  std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
  let cache = layout.cache();
  std::fs::create_dir_all(&cache).with_context(|| format!("creating {}", cache.display()))?;

  let os = kernel_name();
  let archive = cache.join(archive_name(&settings.packer_version, os, &settings.arch));
  let downloaded = if archive.is_file() {
    log.info(format!("Using cached {}", archive.display()));
    false
  } else {
    let url = download_url(settings, os);
    log.info(format!("Downloading {}", url));
    source.download(&url, &archive)?;
    true
  };

  log.info(format!("Extracting {} into {}", archive.display(), dir.display()));
  source.extract(&archive, &dir).with_context(|| format!("extracting {}", archive.display()))?;

  let after = installed_version(&layout.packer_bin());
  if after.as_deref() != Some(state.target.as_str()) {
    return Err(RunError::ToolVersionMismatch { expected: state.target, found: after }.into());
  }
  Ok(InstallOutcome::Installed { downloaded })
}
