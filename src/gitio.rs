use anyhow::{Context, Result};
use std::path::Path;
use crate::util::run_git;

pub fn clone(url: &str, dest: &Path, parent: &Path) -> Result<()> {
    let args: Vec<&std::ffi::OsStr> = vec!["clone".as_ref(), url.as_ref(), dest.as_os_str()];
    run_git(parent, &args)?;
    Ok(())
}

pub fn fetch_origin(repo: &Path) -> Result<()> {
    run_git(repo, &["fetch", "origin"])?;
    Ok(())
}

/// True when tracked files differ from HEAD.
pub fn has_local_changes(repo: &Path) -> Result<bool> {
    // Refresh stat info so touched-but-unchanged files don't count as dirty.
    let _ = run_git(repo, &["update-index", "-q", "--refresh"]);
    // diff-index --quiet: exit 0 = clean, 1 = changes, anything else = git error
    let out = std::process::Command::new("git")
        .args(["diff-index", "--quiet", "HEAD", "--"])
        .current_dir(repo)
        .output()
        .with_context(|| format!("spawning git diff-index in {}", repo.display()))?;
    match out.status.code() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            anyhow::bail!("git diff-index --quiet HEAD -- failed ({}): {}", out.status, stderr.trim())
        }
    }
}

pub fn stash(repo: &Path) -> Result<()> {
    run_git(repo, &["stash"])?;
    Ok(())
}

pub fn checkout(repo: &Path, branch: &str) -> Result<()> {
    run_git(repo, &["checkout", branch])?;
    Ok(())
}

/// True when `origin/<branch>` exists as a remote-tracking ref.
pub fn has_remote_branch(repo: &Path, branch: &str) -> bool {
    let refname = format!("refs/remotes/origin/{}", branch);
    run_git(repo, &["rev-parse", "--verify", "--quiet", refname.as_str()]).is_ok()
}

/// Move the checked-out branch forward to `origin/<branch>`; refuses to rewrite local history.
pub fn fast_forward(repo: &Path, branch: &str) -> Result<()> {
    let upstream = format!("origin/{}", branch);
    run_git(repo, &["merge", "--ff-only", upstream.as_str()])?;
    Ok(())
}

pub fn submodule_update(repo: &Path) -> Result<()> {
    run_git(repo, &["submodule", "update", "--init", "--recursive"])?;
    Ok(())
}

pub fn current_branch(repo: &Path) -> Result<Option<String>> {
    let out = run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let name = out.trim();
    if name == "HEAD" { Ok(None) } else { Ok(Some(name.to_string())) }
}
