//! # Version-Control Backend
//!
//! This module defines the capability interface the synchronizer, segmenter
//! and replayer use to act on a module's working copy, and the git-backed
//! implementation used by the binary.
//!
//! ## Design
//!
//! - **`Backend`**: one session bound to one working-copy path. It performs
//!   single version-control operations and makes no policy decisions; the
//!   ordering, safety checks and error classification live in the callers.
//!
//! - **`GitBackend`**: the default implementation, delegating every operation
//!   to the free functions in [`crate::git`].
//!
//! The trait keeps the core state machines testable: unit tests swap in a
//! recording mock and never touch a real repository. A session must not be
//! shared between concurrent operations on the same module.

use std::path::{Path, PathBuf};

use crate::defaults;
use crate::error::Result;

/// Name and email recorded as author or committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// The fixed identity used for backups, normalized history and replays.
    pub fn synthetic() -> Self {
        Self::new(defaults::SYNTHETIC_NAME, defaults::SYNTHETIC_EMAIL)
    }
}

/// Version-control operations against a single module working copy.
pub trait Backend {
    /// The working-copy path this session is bound to.
    fn path(&self) -> &Path;

    /// Clone `source` into [`Backend::path`].
    fn clone_from(&self, source: &str) -> Result<()>;

    /// Whether [`Backend::path`] is the root of a repository.
    fn is_repository(&self) -> bool;

    /// Fetch the remote, force-checkout `branch` and hard reset it to the
    /// remote tip. Tracked local changes are discarded.
    fn fetch_and_hard_reset_to_remote(&self, branch: &str) -> Result<()>;

    /// Delete untracked files and directories. Ignored files stay.
    fn remove_untracked(&self) -> Result<()>;

    fn checkout(&self, reference: &str) -> Result<()>;

    /// `None` when `HEAD` is detached.
    fn current_branch(&self) -> Result<Option<String>>;

    /// Create `name` at `HEAD` and switch to it.
    fn create_branch(&self, name: &str) -> Result<()>;

    fn delete_branch(&self, name: &str) -> Result<()>;

    fn list_branches(&self, pattern: &str) -> Result<Vec<String>>;

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Commit a tag points at, `None` when the tag does not exist.
    fn resolve_tag(&self, name: &str) -> Result<Option<String>>;

    /// Full commit id of a revision expression.
    fn rev_parse(&self, reference: &str) -> Result<String>;

    /// Tags reachable from `HEAD`, most recent first.
    fn list_tags_newest_first(&self) -> Result<Vec<String>>;

    /// Stage all non-ignored changes and commit them.
    fn commit_all(&self, author: &Identity, committer: &Identity, message: &str) -> Result<()>;

    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Set aside uncommitted state. Returns whether anything was stashed.
    fn stash(&self) -> Result<bool>;

    /// Restore the state set aside by [`Backend::stash`].
    fn stash_pop(&self) -> Result<()>;

    /// Force the synthetic committer and committer date = author date on
    /// every commit in `(range_start, range_end]`, moving `HEAD` and tags.
    /// Returns the number of commits that changed.
    fn rewrite_committer_metadata(&self, range_start: &str, range_end: &str) -> Result<usize>;

    /// Export `(range_start, range_end]` as numbered patch files.
    fn export_patch_series(
        &self,
        range_start: &str,
        range_end: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>>;

    /// Apply one exported patch record as a new commit.
    ///
    /// A record that does not apply leaves an interrupted session behind.
    fn apply_patch(&self, record: &Path) -> Result<()>;

    /// Whether an interrupted patch application is still pending.
    fn has_pending_apply(&self) -> Result<bool>;

    /// Forget a pending patch application without touching `HEAD`, the
    /// index or the working tree.
    fn quit_pending_apply(&self) -> Result<()>;
}

/// [`Backend`] implementation driving the system `git` command.
#[derive(Debug, Clone)]
pub struct GitBackend {
    path: PathBuf,
    identity: Identity,
}

impl GitBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            identity: Identity::synthetic(),
        }
    }
}

impl Backend for GitBackend {
    fn path(&self) -> &Path {
        &self.path
    }

    fn clone_from(&self, source: &str) -> Result<()> {
        crate::git::clone(source, &self.path)
    }

    fn is_repository(&self) -> bool {
        crate::git::is_repository(&self.path)
    }

    fn fetch_and_hard_reset_to_remote(&self, branch: &str) -> Result<()> {
        crate::git::fetch_and_hard_reset_to_remote(&self.path, branch)
    }

    fn remove_untracked(&self) -> Result<()> {
        crate::git::remove_untracked(&self.path)
    }

    fn checkout(&self, reference: &str) -> Result<()> {
        crate::git::checkout(&self.path, reference)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        crate::git::current_branch(&self.path)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        crate::git::create_branch(&self.path, name)
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        crate::git::delete_branch(&self.path, name)
    }

    fn list_branches(&self, pattern: &str) -> Result<Vec<String>> {
        crate::git::list_branches(&self.path, pattern)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        crate::git::is_ancestor(&self.path, ancestor, descendant)
    }

    fn resolve_tag(&self, name: &str) -> Result<Option<String>> {
        crate::git::resolve_tag(&self.path, name)
    }

    fn rev_parse(&self, reference: &str) -> Result<String> {
        crate::git::rev_parse(&self.path, reference)
    }

    fn list_tags_newest_first(&self) -> Result<Vec<String>> {
        crate::git::list_tags_newest_first(&self.path)
    }

    fn commit_all(&self, author: &Identity, committer: &Identity, message: &str) -> Result<()> {
        crate::git::commit_all(&self.path, author, committer, message)
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        crate::git::has_uncommitted_changes(&self.path)
    }

    fn stash(&self) -> Result<bool> {
        crate::git::stash(&self.path, &self.identity)
    }

    fn stash_pop(&self) -> Result<()> {
        crate::git::stash_pop(&self.path)
    }

    fn rewrite_committer_metadata(&self, range_start: &str, range_end: &str) -> Result<usize> {
        crate::git::rewrite_committer_metadata(&self.path, range_start, range_end, &self.identity)
    }

    fn export_patch_series(
        &self,
        range_start: &str,
        range_end: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        crate::git::export_patch_series(&self.path, range_start, range_end, output_dir)
    }

    fn apply_patch(&self, record: &Path) -> Result<()> {
        crate::git::apply_patch(&self.path, record, &self.identity)
    }

    fn has_pending_apply(&self) -> Result<bool> {
        crate::git::has_pending_apply(&self.path)
    }

    fn quit_pending_apply(&self) -> Result<()> {
        crate::git::quit_pending_apply(&self.path)
    }
}
