// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Assemble and run `packer build` for the resolved source, then clean up the legacy cache dir
// role: orchestration/build
// inputs: BuildConfig (platforms, user_data, version, source_dir), Layout, Settings (template, env); Logger
// outputs: Build artifacts under artifacts/ (written by packer); builder output in the run log
// side_effects: Creates artifacts/ and .data/tmp; spawns packer in the source dir; removes an empty packer_cache/
// invariants:
// - Argument order: build, -force, [-only <a,b>], [-var N=V]..., <template>
// - At most one -only entry; -var entries keep the order given on the command line
// - The template must exist before packer is spawned
// - ARTIFACTS, VERSION, PACKER_CACHE_DIR, TMPDIR, PATH are always set and win over [env]
// errors: MissingTemplate before spawning; BuilderFailed on non-zero exit; cleanup never fails
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use crate::cli::BuildConfig;
use crate::error::{exit_code, RunError};
use crate::layout::{Layout, LEGACY_CACHE_DIR};
use crate::logger::Logger;
use crate::settings::Settings;
use crate::util::run_teed;

pub fn assemble_args(cfg: &BuildConfig, template: &Path) -> Vec<String> {
  let mut args: Vec<String> = vec!["build".into(), "-force".into()];
  if !cfg.platforms.is_empty() {
    args.push("-only".into());
    args.push(cfg.platforms.join(","));
  }
  for var in &cfg.user_data {
    args.push("-var".into());
    args.push(var.as_arg());
  }
  args.push(template.to_string_lossy().into_owned());
  args
}

pub fn builder_env(cfg: &BuildConfig, layout: &Layout, settings: &Settings) -> Result<Vec<(String, String)>> {
  let mut env: Vec<(String, String)> = settings.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

  let mut path_entries = vec![layout.packer_dir()];
  if let Some(existing) = std::env::var_os("PATH") {
    path_entries.extend(std::env::split_paths(&existing));
  }
  let path = std::env::join_paths(path_entries).context("building PATH for packer")?;

  env.extend([
    ("ARTIFACTS".to_string(), layout.artifacts().to_string_lossy().into_owned()),
    ("VERSION".to_string(), cfg.version.clone()),
    ("PACKER_CACHE_DIR".to_string(), layout.cache().to_string_lossy().into_owned()),
    ("TMPDIR".to_string(), layout.tmp().to_string_lossy().into_owned()),
    ("PATH".to_string(), path.to_string_lossy().into_owned()),
  ]);
  Ok(env)
}

pub fn run_build(cfg: &BuildConfig, layout: &Layout, settings: &Settings, log: &Logger) -> Result<()> {
  let template = cfg.source_dir.join(&settings.template);
  if !template.is_file() {
    return Err(RunError::MissingTemplate(template).into());
  }

  for dir in [layout.artifacts(), layout.tmp()] {
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
  }

  let args = assemble_args(cfg, &template);
  log.info(format!("Running packer {}", args.join(" ")));

  let mut cmd = Command::new(layout.packer_bin());
  cmd
    .args(&args)
    .current_dir(&cfg.source_dir)
    .envs(builder_env(cfg, layout, settings)?);
  let status = run_teed(&mut cmd, log)?;
  if !status.success() {
    return Err(RunError::BuilderFailed { code: exit_code(status) }.into());
  }
  log.info(format!("Build of {} {} finished", cfg.name, cfg.version));
  Ok(())
}

/// Remove the legacy per-source cache dir if it is empty; anything else is left alone.
pub fn cleanup(cfg: &BuildConfig, log: &Logger) {
  let legacy = cfg.source_dir.join(LEGACY_CACHE_DIR);
  if std::fs::remove_dir(&legacy).is_ok() {
    log.info(format!("Removed empty {}", legacy.display()));
  }
}
