// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fixed on-disk layout relative to the program root (sources, artifacts, .data/*)
// role: paths/layout
// inputs: Program root (--root or the executable's directory)
// outputs: Layout with absolute paths for every well-known location
// side_effects: ensure_dirs creates directories; nothing else touches the filesystem
// invariants: Every path is derived from root; source dirs always live under root/sources
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const SETTINGS_FILE: &str = "sources.cfg";
pub const CONFIGURE_HOOK: &str = "configure";
pub const LEGACY_CACHE_DIR: &str = "packer_cache";

#[derive(Debug, Clone)]
pub struct Layout {
  pub root: PathBuf,
}

impl Layout {
  pub fn new<P: Into<PathBuf>>(root: P) -> Self {
    Layout { root: root.into() }
  }

  /// Root next to the running executable.
  pub fn from_current_exe() -> Result<Self> {
    let exe = std::env::current_exe().context("locating the running executable")?;
    let dir = exe
      .parent()
      .map(Path::to_path_buf)
      .with_context(|| format!("executable {} has no parent directory", exe.display()))?;
    Ok(Layout::new(dir))
  }

  pub fn sources(&self) -> PathBuf {
    self.root.join("sources")
  }

  pub fn source_dir(&self, name: &str) -> PathBuf {
    self.sources().join(name)
  }

  pub fn artifacts(&self) -> PathBuf {
    self.root.join("artifacts")
  }

  pub fn data(&self) -> PathBuf {
    self.root.join(".data")
  }

  pub fn cache(&self) -> PathBuf {
    self.data().join("cache")
  }

  pub fn tmp(&self) -> PathBuf {
    self.data().join("tmp")
  }

  pub fn packer_dir(&self) -> PathBuf {
    self.data().join("packer")
  }

  pub fn packer_bin(&self) -> PathBuf {
    self.packer_dir().join(if cfg!(windows) { "packer.exe" } else { "packer" })
  }

  pub fn log_file(&self) -> PathBuf {
    self.data().join("run.log")
  }

  pub fn settings_file(&self) -> PathBuf {
    self.root.join(SETTINGS_FILE)
  }

  /// Create the directories every run relies on.
  pub fn ensure_dirs(&self) -> Result<()> {
    for dir in [self.data(), self.cache(), self.tmp(), self.artifacts()] {
      std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn paths_hang_off_root() {
    let l = Layout::new("/opt/images");
    assert_eq!(l.source_dir("web"), PathBuf::from("/opt/images/sources/web"));
    assert_eq!(l.log_file(), PathBuf::from("/opt/images/.data/run.log"));
    assert_eq!(l.cache(), PathBuf::from("/opt/images/.data/cache"));
    assert_eq!(l.settings_file(), PathBuf::from("/opt/images/sources.cfg"));
    assert!(l.packer_bin().starts_with("/opt/images/.data/packer"));
  }

  #[test]
  fn ensure_dirs_creates_tree() {
    let td = tempfile::TempDir::new().unwrap();
    let l = Layout::new(td.path());
    l.ensure_dirs().unwrap();
    assert!(l.cache().is_dir());
    assert!(l.tmp().is_dir());
    assert!(l.artifacts().is_dir());
  }
}
