// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Drive one run through its fixed stages: fetch, configure, install tool, build, clean up
// role: processing/orchestrator
// inputs: BuildConfig; ToolSource for the installer; Logger
// outputs: Final Stage on success; the first error otherwise
// side_effects: Everything the stage modules do (git, hooks, downloads, packer)
// invariants:
// - Stages advance strictly in order Init → Parsed → Fetched → Configured → ToolReady → Built → CleanedUp
// - The first failing stage stops the run; later stages never start
// - Every transition is written to the run log
// - sources.cfg is parsed before any git or network work
// errors: Propagated unchanged from the stage that failed, with the stage name as context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;

use anyhow::{Context, Result};

use crate::build;
use crate::cli::BuildConfig;
use crate::fetch;
use crate::hooks;
use crate::installer::{self, ToolSource};
use crate::logger::{Level, Logger};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
  Init,
  Parsed,
  Fetched,
  Configured,
  ToolReady,
  Built,
  CleanedUp,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Stage::Init => "init",
      Stage::Parsed => "parsed",
      Stage::Fetched => "fetched",
      Stage::Configured => "configured",
      Stage::ToolReady => "tool-ready",
      Stage::Built => "built",
      Stage::CleanedUp => "cleaned-up",
    };
    f.write_str(s)
  }
}

struct Tracker<'a> {
  stage: Stage,
  log: &'a Logger,
}

impl<'a> Tracker<'a> {
  fn advance(&mut self, next: Stage) {
    debug_assert!(next > self.stage, "stage {} cannot follow {}", next, self.stage);
    self.log.record(Level::Info, &format!("stage {} -> {}", self.stage, next));
    self.stage = next;
  }
}

/// Run every stage after option parsing. `cfg` is already validated.
pub fn run(cfg: &BuildConfig, tools: &dyn ToolSource, log: &Logger) -> Result<Stage> {
  let layout = cfg.layout();
  let mut t = Tracker { stage: Stage::Init, log };

  if let Ok(json) = serde_json::to_string(cfg) {
    log.record(Level::Info, &format!("config {}", json));
  }
  t.advance(Stage::Parsed);

  // Settings are read up front so a bad sources.cfg fails before any clone.
  let settings = Settings::load(&layout.settings_file())?;
  layout.ensure_dirs()?;
  fetch::fetch_source(cfg, log).context("fetching source")?;
  if !cfg.source_dir.is_dir() {
    anyhow::bail!("source directory {} does not exist", cfg.source_dir.display());
  }
  t.advance(Stage::Fetched);

  hooks::run_hooks(cfg, &layout, &settings, log).context("running pre-build hooks")?;
  t.advance(Stage::Configured);

  installer::ensure_packer(&layout, &settings, tools, log).context("installing packer")?;
  t.advance(Stage::ToolReady);

  build::run_build(cfg, &layout, &settings, log)?;
  t.advance(Stage::Built);

  build::cleanup(cfg, log);
  t.advance(Stage::CleanedUp);

  Ok(t.stage)
}
