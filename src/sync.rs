//! # Module Synchronization
//!
//! Brings one module from "missing or in an unknown state" to "checked out at
//! its pinned revision". When the working copy already exists its state is
//! either preserved on a backup branch first or explicitly discarded; the
//! destructive reset never runs after a failed backup.
//!
//! ## Steps
//!
//! 1. Missing path: clone the module's source.
//! 2. Existing path: require a repository, then back up or discard local
//!    state depending on the caller's choice. An interrupted patch
//!    application left by a failed replay is dropped.
//! 3. Force-checkout the tracked branch at the remote tip. Without a backup,
//!    untracked files are deleted too.
//! 4. Check out the pinned revision, detached when upstream moved past it.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::backend::{Backend, Identity};
use crate::defaults;
use crate::error::{Error, Result};
use crate::registry::Module;

/// What [`sync`] did to the working copy before resetting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// The path was missing and the module was cloned.
    Cloned,
    /// Prior state was saved on `branch`; `committed_changes` is set when
    /// uncommitted work was committed onto it.
    BackedUp {
        branch: String,
        committed_changes: bool,
    },
    /// Prior state was discarded without a backup.
    ResetWithoutBackup,
}

/// Result of synchronizing one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub action: SyncAction,
    /// Commit checked out at the end.
    pub head: String,
    /// Whether the tracked branch tip differs from the pin.
    pub detached: bool,
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Pick a backup branch name not yet used in the working copy.
///
/// Names are `backup/<branch>-<seconds>`; when that exists, `-2`, `-3`...
/// are appended so two syncs within one second never collide.
pub fn unique_backup_name(
    backend: &dyn Backend,
    module: &Module,
    current_branch: Option<&str>,
    timestamp: u64,
) -> Result<String> {
    let label = current_branch.unwrap_or("detached").replace('/', "-");
    let base = format!("{}{}-{}", defaults::BACKUP_PREFIX, label, timestamp);

    let taken = backend.list_branches(&format!("{}*", base))?;
    if !taken.contains(&base) {
        return Ok(base);
    }
    for n in 2..=defaults::BACKUP_NAME_ATTEMPTS {
        let candidate = format!("{}-{}", base, n);
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::NamingCollision {
        module: module.name.clone(),
        name: base,
    })
}

fn backup_failed(module: &Module, step: &str, error: Error) -> Error {
    Error::BackupFailed {
        module: module.name.clone(),
        step: step.to_string(),
        message: error.to_string(),
    }
}

/// Save the current state of the working copy on a fresh backup branch.
///
/// Returns the branch name and whether uncommitted changes were committed.
fn back_up(backend: &dyn Backend, module: &Module) -> Result<(String, bool)> {
    let timestamp = epoch_seconds();
    let current = backend
        .current_branch()
        .map_err(|e| backup_failed(module, "inspect branch", e))?;
    let name = unique_backup_name(backend, module, current.as_deref(), timestamp)?;

    backend
        .create_branch(&name)
        .map_err(|e| backup_failed(module, "create branch", e))?;

    let dirty = backend
        .has_uncommitted_changes()
        .map_err(|e| backup_failed(module, "inspect changes", e))?;
    if dirty {
        let identity = Identity::synthetic();
        let message = format!(
            "Backup of uncommitted changes on {} at {}",
            current.as_deref().unwrap_or("detached HEAD"),
            timestamp
        );
        backend
            .commit_all(&identity, &identity, &message)
            .map_err(|e| backup_failed(module, "commit changes", e))?;
    }

    info!("{}: saved prior state on {}", module.name, name);
    Ok((name, dirty))
}

/// Synchronize `module` to its pinned revision.
///
/// With `allow_backup` false any local state of an existing working copy is
/// discarded; that is an explicit, irreversible choice of the caller.
pub fn sync(backend: &dyn Backend, module: &Module, allow_backup: bool) -> Result<SyncOutcome> {
    let action = if !backend.path().exists() {
        info!("{}: cloning {}", module.name, module.source);
        backend
            .clone_from(&module.source)
            .map_err(|e| Error::CloneFailed {
                module: module.name.clone(),
                url: module.source.clone(),
                message: e.to_string(),
            })?;
        SyncAction::Cloned
    } else if !backend.is_repository() {
        return Err(Error::InvalidModule {
            module: module.name.clone(),
            path: backend.path().display().to_string(),
        });
    } else if allow_backup {
        let (branch, committed_changes) = back_up(backend, module)?;
        SyncAction::BackedUp {
            branch,
            committed_changes,
        }
    } else {
        warn!("{}: discarding local changes without backup", module.name);
        SyncAction::ResetWithoutBackup
    };

    if action != SyncAction::Cloned && backend.has_pending_apply()? {
        warn!("{}: dropping an interrupted patch application", module.name);
        backend.quit_pending_apply()?;
    }

    info!("{}: resetting {} to the remote tip", module.name, module.branch);
    backend.fetch_and_hard_reset_to_remote(&module.branch)?;
    if action == SyncAction::ResetWithoutBackup {
        backend.remove_untracked()?;
    }
    let tip = backend.rev_parse("HEAD")?;

    backend.checkout(&module.pinned_revision)?;
    let head = backend.rev_parse("HEAD")?;
    let detached = head != tip;
    if detached {
        warn!(
            "{}: {} has moved past the pin; detached at {}",
            module.name, module.branch, module.pinned_revision
        );
    }

    Ok(SyncOutcome {
        action,
        head,
        detached,
    })
}

/// Delete every backup branch of `module` except the checked-out one.
///
/// Returns the deleted branch names.
pub fn clean(backend: &dyn Backend, module: &Module) -> Result<Vec<String>> {
    if !backend.is_repository() {
        return Err(Error::InvalidModule {
            module: module.name.clone(),
            path: backend.path().display().to_string(),
        });
    }

    let current = backend.current_branch()?;
    let mut deleted = Vec::new();
    for branch in backend.list_branches(&format!("{}*", defaults::BACKUP_PREFIX))? {
        if current.as_deref() == Some(branch.as_str()) {
            warn!("{}: keeping checked-out backup branch {}", module.name, branch);
            continue;
        }
        backend.delete_branch(&branch)?;
        deleted.push(branch);
    }
    Ok(deleted)
}
