// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Run the pre-build hooks (sources.cfg pre_build command, per-source configure script) as subprocesses
// role: orchestration/hooks
// inputs: BuildConfig, Layout, Settings; Logger
// outputs: Nothing on success; hook output goes to the terminal and run log
// side_effects: Spawns hook processes with the environment contract below
// invariants:
// - Environment contract: [env] first, then PACKER_RUNNER_ROOT, SOURCE_NAME, SOURCE_DIR, VERSION, ARTIFACTS, BRANCH (these win)
// - pre_build runs from the program root; configure runs from the source dir via `sh configure`
// - A hook never mutates this process's environment or working directory
// errors: Non-zero exit => RunError::HookFailed; unparsable pre_build => usage-style error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::process::Command;

use anyhow::{bail, Result};

use crate::cli::BuildConfig;
use crate::error::{exit_code, RunError};
use crate::layout::{Layout, CONFIGURE_HOOK};
use crate::logger::Logger;
use crate::settings::Settings;
use crate::util::run_teed;

pub fn hook_env(cfg: &BuildConfig, layout: &Layout, settings: &Settings) -> Vec<(String, String)> {
  let mut env: Vec<(String, String)> = settings.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
  env.extend([
    ("PACKER_RUNNER_ROOT".to_string(), layout.root.to_string_lossy().into_owned()),
    ("SOURCE_NAME".to_string(), cfg.name.clone()),
    ("SOURCE_DIR".to_string(), cfg.source_dir.to_string_lossy().into_owned()),
    ("VERSION".to_string(), cfg.version.clone()),
    ("ARTIFACTS".to_string(), layout.artifacts().to_string_lossy().into_owned()),
    ("BRANCH".to_string(), cfg.branch.clone()),
  ]);
  env
}

pub fn run_hooks(cfg: &BuildConfig, layout: &Layout, settings: &Settings, log: &Logger) -> Result<()> {
  let env = hook_env(cfg, layout, settings);

  if let Some(line) = settings.pre_build.as_deref().filter(|l| !l.trim().is_empty()) {
    let Some(argv) = shlex::split(line) else {
      bail!("pre_build {:?} is not a valid command line", line);
    };
    let Some((program, args)) = argv.split_first() else {
      bail!("pre_build {:?} is empty", line);
    };
    log.info(format!("Running pre-build hook: {}", line));
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(&layout.root).envs(env.iter().cloned());
    check(run_teed(&mut cmd, log)?, line)?;
  }

  let configure = cfg.source_dir.join(CONFIGURE_HOOK);
  if configure.is_file() {
    log.info(format!("Running {}", configure.display()));
    let mut cmd = Command::new("sh");
    cmd.arg(CONFIGURE_HOOK).current_dir(&cfg.source_dir).envs(env.iter().cloned());
    check(run_teed(&mut cmd, log)?, CONFIGURE_HOOK)?;
  }

  Ok(())
}

fn check(status: std::process::ExitStatus, hook: &str) -> Result<()> {
  if status.success() {
    Ok(())
  } else {
    Err(RunError::HookFailed { hook: hook.to_string(), code: exit_code(status) }.into())
  }
}
