//! # Patch Replay
//!
//! Applies a requested patch set, and every set it requires, to a module's
//! current checkout. Sets are applied prerequisites first; records within a
//! set in ascending sequence order, each becoming one commit with the
//! synthetic committer and committer date = author date. Replaying a saved
//! series onto the pin therefore reproduces the saved commit ids.
//!
//! Replay stops at the first record that does not apply and leaves the
//! module in that state for manual resolution. A module in that state is not
//! replayed onto again until a sync clears it.

use std::path::Path;

use log::{debug, info, warn};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::patchset::{PatchSeries, PatchSetChain};
use crate::registry::Module;

/// Records applied for one patch set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSet {
    pub name: String,
    pub records: usize,
}

/// Result of applying a patch set to one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Applied sets in application order.
    pub applied: Vec<AppliedSet>,
    /// Sets with no directory for this module.
    pub missing: Vec<String>,
}

impl ApplyReport {
    pub fn total_records(&self) -> usize {
        self.applied.iter().map(|s| s.records).sum()
    }
}

/// Apply `patch_set` and its prerequisites to `module`.
pub fn apply(
    backend: &dyn Backend,
    module: &Module,
    chain: &PatchSetChain,
    patches_root: &Path,
    patch_set: &str,
) -> Result<ApplyReport> {
    let order = chain.resolve(patch_set)?;

    if !backend.is_repository() {
        return Err(Error::InvalidModule {
            module: module.name.clone(),
            path: backend.path().display().to_string(),
        });
    }
    if backend.has_pending_apply()? {
        return Err(Error::ApplyInProgress {
            module: module.name.clone(),
            path: backend.path().display().to_string(),
        });
    }

    let mut report = ApplyReport::default();
    for set in order {
        let dir = module.patch_set_dir(patches_root, &set);
        if !dir.is_dir() {
            warn!("{}: no records for patch set '{}' in {}", module.name, set, dir.display());
            report.missing.push(set);
            continue;
        }

        let series = PatchSeries::load(&dir)?;
        for record in &series.records {
            debug!("{}: applying {}", module.name, record.file_name());
            backend
                .apply_patch(&record.path)
                .map_err(|e| Error::ApplyConflict {
                    module: module.name.clone(),
                    patch_set: set.clone(),
                    record: record.file_name(),
                    message: e.to_string(),
                })?;
        }
        info!("{}: applied {} record(s) from '{}'", module.name, series.len(), set);
        report.applied.push(AppliedSet {
            name: set,
            records: series.len(),
        });
    }
    Ok(report)
}
