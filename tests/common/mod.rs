//! Shared test utilities for integration and E2E tests.
//!
//! Tests build real git repositories in temporary directories: an
//! "upstream" repository standing in for a module's source, and a workspace
//! holding `.patchstack.yaml` whose module URL points at it.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     require_git!();
//!     let fixture = TestFixture::new();
//!     fixture.command().arg("update").assert().success();
//! }
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::{git, git_available, Upstream, TestFixture, MODULE_DIR, MODULE_NAME};
    pub use crate::require_git;
}

pub const MODULE_NAME: &str = "libfoo";
pub const MODULE_DIR: &str = "vendor/libfoo";

/// Identity used for commits the tests themselves create.
const AUTHOR: [(&str, &str); 4] = [
    ("GIT_AUTHOR_NAME", "Test Author"),
    ("GIT_AUTHOR_EMAIL", "author@example.com"),
    ("GIT_COMMITTER_NAME", "Test Author"),
    ("GIT_COMMITTER_EMAIL", "author@example.com"),
];

/// Whether a usable `git` binary is on `PATH`.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Return early from a test when `git` is not installed.
#[macro_export]
macro_rules! require_git {
    () => {
        if !$crate::common::git_available() {
            println!("Skipping test: git is not available");
            return;
        }
    };
}

/// Run git in `dir`, panicking on failure, and return trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .envs(AUTHOR)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Write `content` to `file` in `dir` and commit it with `message`.
pub fn commit_file(dir: &Path, file: &str, content: &str, message: &str) -> String {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(&path, content).expect("Failed to write file");
    git(dir, &["add", file]);
    git(dir, &["commit", "--quiet", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// An upstream repository on branch `main`.
pub struct Upstream {
    temp_dir: assert_fs::TempDir,
}

impl Upstream {
    /// Repository with one commit, `A`, adding `lib.c`.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        git(temp_dir.path(), &["init", "--quiet"]);
        git(temp_dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        let upstream = Self { temp_dir };
        upstream.commit("lib.c", "int answer(void) { return 41; }\n", "A");
        upstream
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn url(&self) -> String {
        self.path().display().to_string()
    }

    pub fn commit(&self, file: &str, content: &str, message: &str) -> String {
        commit_file(self.path(), file, content, message)
    }

    pub fn head(&self) -> String {
        git(self.path(), &["rev-parse", "HEAD"])
    }
}

/// A workspace directory with `.patchstack.yaml` tracking one upstream.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
    pub upstream: Upstream,
    pub pin: String,
}

impl TestFixture {
    /// Workspace tracking a fresh upstream, pinned at its first commit.
    pub fn new() -> Self {
        let upstream = Upstream::new();
        let pin = upstream.head();
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
            upstream,
            pin,
        };
        fixture.write_config(&fixture.pin);
        fixture
    }

    /// Rewrite the configuration to pin the module at `commit`.
    pub fn write_config(&self, commit: &str) {
        self.write_config_with_patch_sets(commit, &[]);
    }

    /// Like [`TestFixture::write_config`], with a `patch_sets:` block
    /// declaring each `(name, requires)` pair instead of the default chain.
    pub fn write_config_with_patch_sets(&self, commit: &str, patch_sets: &[(&str, &[&str])]) {
        let mut yaml = String::new();
        if !patch_sets.is_empty() {
            yaml.push_str("patch_sets:\n");
            for (name, requires) in patch_sets {
                yaml.push_str(&format!("  - name: {}\n    requires: [{}]\n", name, requires.join(", ")));
            }
        }
        yaml.push_str(&format!(
            "modules:\n  - name: {}\n    url: {}\n    branch: main\n    commit: {}\n    directory: {}\n",
            MODULE_NAME,
            self.upstream.url(),
            commit,
            MODULE_DIR
        ));
        self.temp_dir
            .child(".patchstack.yaml")
            .write_str(&yaml)
            .expect("Failed to write config file");
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join(".patchstack.yaml")
    }

    /// The module's working copy.
    pub fn module_path(&self) -> PathBuf {
        self.path().join(MODULE_DIR)
    }

    /// Saved records of one patch set.
    pub fn patch_dir(&self, patch_set: &str) -> PathBuf {
        self.path().join("patches").join(MODULE_DIR).join(patch_set)
    }

    pub fn patch_files(&self, patch_set: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.patch_dir(patch_set))
            .expect("Failed to read patch directory")
            .map(|e| e.expect("Failed to read entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("patchstack");
        cmd.current_dir(self.path())
            .env_remove("PATCHSTACK_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }

    /// Clone the module and stack `generic` (B) and `specific` (D) on the pin.
    pub fn with_layered_module(self) -> Self {
        self.command().arg("update").assert().success();
        let module = self.module_path();
        commit_file(&module, "generic.c", "void generic(void) {}\n", "B");
        git(&module, &["tag", "generic"]);
        commit_file(&module, "lib.c", "int answer(void) { return 42; }\n", "D");
        git(&module, &["tag", "specific"]);
        self
    }
}
