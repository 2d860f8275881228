// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Declarative sources.cfg (TOML) read from the program root: pinned tool version, download location, template name, hooks, extra env
// role: config/settings
// inputs: <root>/sources.cfg (optional)
// outputs: Settings with defaults filled in
// invariants:
// - Missing file yields Settings::default()
// - Unknown keys are rejected (closed schema)
// - env keys are non-empty and contain no '='
// errors: Read/parse failures carry the file path
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const PACKER_VERSION: &str = "1.2.5";
pub const DOWNLOAD_BASE: &str = "https://releases.hashicorp.com/packer";
pub const ARCH: &str = "amd64";
pub const TEMPLATE: &str = "template.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  pub packer_version: String,
  pub download_base: String,
  pub arch: String,
  pub template: String,
  /// Command line run from the program root before the build.
  pub pre_build: Option<String>,
  pub env: BTreeMap<String, String>,
}

impl Default for Settings {
  fn default() -> Self {
    Settings {
      packer_version: PACKER_VERSION.into(),
      download_base: DOWNLOAD_BASE.into(),
      arch: ARCH.into(),
      template: TEMPLATE.into(),
      pre_build: None,
      env: BTreeMap::new(),
    }
  }
}

impl Settings {
  pub fn load(path: &Path) -> Result<Settings> {
    if !path.exists() {
      return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Settings::parse(&text).with_context(|| format!("parsing {}", path.display()))
  }

  pub fn parse(text: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(text)?;
    settings.validate()?;
    Ok(settings)
  }

  fn validate(&self) -> Result<()> {
    for (key, label) in [
      (&self.packer_version, "packer_version"),
      (&self.download_base, "download_base"),
      (&self.arch, "arch"),
      (&self.template, "template"),
    ] {
      if key.trim().is_empty() {
        bail!("{label} must not be empty");
      }
    }
    if let Some(k) = self.env.keys().find(|k| k.is_empty() || k.contains('=')) {
      bail!("invalid env key {k:?}");
    }
    Ok(())
  }
}
