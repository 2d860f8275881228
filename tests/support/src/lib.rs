//! test-support: helpers for driving the `packer-runner` binary against a throwaway root.
//!
//! ```rust,ignore
//! let ws = test_support::Workspace::new();
//! ws.add_source("web", true);
//! ws.install_fake_packer("0.0.0-test");
//! let out = ws.cmd().args(["-s", "web", "-v", "1.0"]).output().unwrap();
//! ```

use std::path::{Path, PathBuf};

pub const BIN: &str = "packer-runner";

/// Run the binary with `assert_cmd`, returning the ready-to-run `Command`.
pub fn cmd_bin() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin(BIN).expect("binary target not found")
}

/// A temporary program root (`sources/`, `.data/`, `artifacts/`, `sources.cfg`).
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Workspace { dir: tempfile::tempdir().expect("create tempdir") }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.root().join("sources").join(name)
    }

    pub fn artifacts(&self) -> PathBuf {
        self.root().join("artifacts")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root().join(".data").join("run.log")
    }

    /// `cmd_bin()` with `--root` already pointing at this workspace.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cmd_bin();
        cmd.arg("--root").arg(self.root());
        cmd
    }

    /// Create `sources/<name>`, optionally with an empty `template.json`.
    pub fn add_source(&self, name: &str, with_template: bool) -> PathBuf {
        let dir = self.source_dir(name);
        std::fs::create_dir_all(&dir).expect("create source dir");
        if with_template {
            std::fs::write(dir.join("template.json"), "{}\n").expect("write template");
        }
        dir
    }

    pub fn write_settings(&self, text: &str) {
        std::fs::write(self.root().join("sources.cfg"), text).expect("write sources.cfg");
    }

    /// Pin `version` in sources.cfg and put a fake `packer` under `.data/packer`.
    ///
    /// `packer version` prints `Packer v<version>`. Any other invocation writes its
    /// arguments to `$ARTIFACTS/args.txt`, `VERSION` to `$ARTIFACTS/version.txt`,
    /// then exits with `$FAKE_PACKER_EXIT` (default 0).
    #[cfg(unix)]
    pub fn install_fake_packer(&self, version: &str) {
        use std::os::unix::fs::PermissionsExt;

        self.write_settings(&format!("packer_version = \"{}\"\n", version));
        let dir = self.root().join(".data").join("packer");
        std::fs::create_dir_all(&dir).expect("create packer dir");
        let bin = dir.join("packer");
        let script = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = version ]; then echo 'Packer v{version}'; exit 0; fi\n\
             printf '%s\\n' \"$@\" > \"$ARTIFACTS/args.txt\"\n\
             echo \"$VERSION\" > \"$ARTIFACTS/version.txt\"\n\
             echo \"fake packer running in $(pwd)\"\n\
             exit ${{FAKE_PACKER_EXIT:-0}}\n"
        );
        std::fs::write(&bin, script).expect("write fake packer");
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).expect("chmod fake packer");
    }

    /// Arguments recorded by the fake packer, one per line.
    pub fn recorded_args(&self) -> Vec<String> {
        let text = std::fs::read_to_string(self.artifacts().join("args.txt")).unwrap_or_default();
        text.lines().map(str::to_string).collect()
    }
}
