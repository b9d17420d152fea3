//! # Patch Segmentation
//!
//! Carves a module's linear history above its pinned revision into patch
//! sets, one per tag marker, and exports each set as numbered patch files.
//!
//! ## Process
//!
//! 1.  **Tag walk**: collect the tags reachable from `HEAD` whose names are
//!     declared patch sets, most recent first.
//! 2.  **Anchor check**: the pinned revision must be an ancestor of the most
//!     recent tag. Older tags that fail the check are reported as corrupt and
//!     end the walk.
//! 3.  **Normalization**: every commit in `(pin, HEAD]` gets the synthetic
//!     committer and committer date = author date, so unchanged content
//!     always exports to identical bytes. Uncommitted work is stashed around
//!     the rewrite.
//! 4.  **Export**: each tag's range `(previous tag or pin, tag]` replaces the
//!     contents of `patches/<module-directory>/<tag>/`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::patchset::PatchSetChain;
use crate::registry::Module;

/// The commit range one patch set covers: `(start, end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRange {
    /// Patch set name, equal to the tag marking its tip.
    pub name: String,
    /// Exclusive lower boundary: the previous tag or the pinned revision.
    pub start: String,
    /// Inclusive upper boundary: the tag itself.
    pub end: String,
}

/// Compute patch set ranges from tags ordered most recent first.
///
/// Each tag covers the commits since the next older tag; the oldest tag
/// starts at `anchor`. With `single_set_only` only the most recent tag is
/// planned and it covers everything since `anchor`.
pub fn plan_ranges(tags_newest_first: &[String], anchor: &str, single_set_only: bool) -> Vec<PatchRange> {
    let Some(newest) = tags_newest_first.first() else {
        return Vec::new();
    };
    if single_set_only {
        return vec![PatchRange {
            name: newest.clone(),
            start: anchor.to_string(),
            end: newest.clone(),
        }];
    }

    tags_newest_first
        .iter()
        .enumerate()
        .map(|(i, tag)| PatchRange {
            name: tag.clone(),
            start: tags_newest_first
                .get(i + 1)
                .cloned()
                .unwrap_or_else(|| anchor.to_string()),
            end: tag.clone(),
        })
        .collect()
}

/// One exported patch set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSet {
    pub range: PatchRange,
    pub dir: PathBuf,
    pub records: Vec<PathBuf>,
}

/// Result of saving one module.
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Exported sets, most recent first.
    pub sets: Vec<ExportedSet>,
    /// Commits that received normalized committer metadata.
    pub normalized: usize,
    /// Tags skipped because they do not descend from the pinned revision.
    pub skipped: Vec<Error>,
}

/// Tag markers of `module`, most recent first, that are valid patch sets.
///
/// Tags whose names the chain does not declare are not markers. Walking
/// stops at the first marker not descending from the pinned revision; that
/// marker is returned as a corrupt-tag error.
fn tag_markers(
    backend: &dyn Backend,
    module: &Module,
    chain: &PatchSetChain,
) -> Result<(Vec<String>, Vec<Error>)> {
    let tags: Vec<String> = backend
        .list_tags_newest_first()?
        .into_iter()
        .filter(|t| chain.contains(t))
        .collect();

    let Some(newest) = tags.first() else {
        return Err(Error::MissingTag {
            module: module.name.clone(),
            tag: chain.names().collect::<Vec<_>>().join(" | "),
        });
    };
    if !backend.is_ancestor(&module.pinned_revision, newest)? {
        return Err(Error::AnchorNotAncestor {
            module: module.name.clone(),
            anchor: module.pinned_revision.clone(),
            tag: newest.clone(),
        });
    }

    let mut markers = Vec::new();
    let mut skipped = Vec::new();
    for tag in tags {
        if !backend.is_ancestor(&module.pinned_revision, &tag)? {
            let corrupt = Error::AnchorNotAncestor {
                module: module.name.clone(),
                anchor: module.pinned_revision.clone(),
                tag,
            };
            warn!("{}; skipping it and older tags", corrupt);
            skipped.push(corrupt);
            break;
        }
        markers.push(tag);
    }
    Ok((markers, skipped))
}

/// Every declared prerequisite of an exported set must have its own marker.
fn check_prerequisites(module: &Module, chain: &PatchSetChain, markers: &[String]) -> Result<()> {
    for marker in markers {
        for required in chain.requires(marker)? {
            if !markers.contains(required) {
                return Err(Error::MissingTag {
                    module: module.name.clone(),
                    tag: required.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Rewrite committer metadata on `(pin, HEAD]` with uncommitted work set
/// aside and restored afterwards, whether or not the rewrite changed anything.
fn normalize_history(backend: &dyn Backend, module: &Module) -> Result<usize> {
    let stashed = backend.stash().map_err(|e| Error::BackupFailed {
        module: module.name.clone(),
        step: "stash uncommitted changes".to_string(),
        message: e.to_string(),
    })?;

    let rewritten = backend.rewrite_committer_metadata(&module.pinned_revision, "HEAD");

    if stashed {
        if let Err(e) = backend.stash_pop() {
            if let Err(rewrite_error) = &rewritten {
                error!("{}: history rewrite failed: {}", module.name, rewrite_error);
            }
            return Err(Error::BackupFailed {
                module: module.name.clone(),
                step: "restore uncommitted changes".to_string(),
                message: e.to_string(),
            });
        }
    }

    rewritten
}

fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Export the patch sets of `module` under `patches_root`.
///
/// With `single_set_only` only the most recent set is exported, covering
/// everything since the pinned revision.
pub fn save(
    backend: &dyn Backend,
    module: &Module,
    chain: &PatchSetChain,
    patches_root: &Path,
    single_set_only: bool,
) -> Result<SaveReport> {
    if !backend.is_repository() {
        return Err(Error::InvalidModule {
            module: module.name.clone(),
            path: backend.path().display().to_string(),
        });
    }

    let (markers, skipped) = tag_markers(backend, module, chain)?;
    if !single_set_only {
        check_prerequisites(module, chain, &markers)?;
    }

    let normalized = normalize_history(backend, module)?;
    if normalized > 0 {
        info!("{}: normalized {} commit(s)", module.name, normalized);
    }

    let mut report = SaveReport {
        sets: Vec::new(),
        normalized,
        skipped,
    };
    for range in plan_ranges(&markers, &module.pinned_revision, single_set_only) {
        // Normalization moved the tags; export from where they point now.
        let tip = backend
            .resolve_tag(&range.end)?
            .ok_or_else(|| Error::MissingTag {
                module: module.name.clone(),
                tag: range.end.clone(),
            })?;
        let dir = module.patch_set_dir(patches_root, &range.name);
        reset_dir(&dir)?;
        let records = backend.export_patch_series(&range.start, &range.end, &dir)?;
        info!(
            "{}: exported {} record(s) for {} ({}..{} at {})",
            module.name,
            records.len(),
            range.name,
            range.start,
            range.end,
            tip
        );
        report.sets.push(ExportedSet {
            range,
            dir,
            records,
        });
    }
    Ok(report)
}
