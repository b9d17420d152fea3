//! # Patch Sets
//!
//! Patch sets are named layers of local modification. This module holds the
//! two pieces of patch-set bookkeeping that do not touch a repository:
//!
//! - **`PatchSetChain`**: the declared sets and their prerequisites, and the
//!   resolution of a requested set into the ordered list of sets to replay.
//! - **`PatchSeries`**: the records of one exported set as laid out on disk,
//!   `NNNN-<description>.patch`, validated to be densely numbered from 1.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// One declared patch set and the sets that must be applied before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSetDecl {
    pub name: String,
    #[serde(default)]
    pub requires: Vec<String>,
}

/// The declared patch sets, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSetChain {
    sets: Vec<PatchSetDecl>,
}

impl Default for PatchSetChain {
    fn default() -> Self {
        let sets = defaults::PATCH_SETS
            .iter()
            .map(|(name, requires)| PatchSetDecl {
                name: name.to_string(),
                requires: requires.iter().map(|r| r.to_string()).collect(),
            })
            .collect();
        Self { sets }
    }
}

impl PatchSetChain {
    /// Validate declarations: unique names, known prerequisites, no cycles.
    pub fn new(sets: Vec<PatchSetDecl>) -> Result<Self> {
        for (i, set) in sets.iter().enumerate() {
            if set.name.trim().is_empty() || set.name.contains('/') {
                return Err(Error::ConfigParse {
                    message: format!("Invalid patch set name '{}'", set.name),
                    hint: Some("Patch set names are tag names and directory names; avoid '/'".to_string()),
                });
            }
            if sets[..i].iter().any(|s| s.name == set.name) {
                return Err(Error::ConfigParse {
                    message: format!("Duplicate patch set '{}'", set.name),
                    hint: None,
                });
            }
        }

        let chain = Self { sets };
        for set in &chain.sets {
            for required in &set.requires {
                if !chain.contains(required) {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "Patch set '{}' requires undeclared set '{}'",
                            set.name, required
                        ),
                        hint: Some(format!("Declare '{}' under patch_sets", required)),
                    });
                }
            }
        }
        for set in &chain.sets {
            chain.resolve(&set.name)?;
        }
        Ok(chain)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.iter().any(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|s| s.name.as_str())
    }

    /// Direct prerequisites of `name`.
    pub fn requires(&self, name: &str) -> Result<&[String]> {
        self.sets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.requires.as_slice())
            .ok_or_else(|| Error::UnknownPatchSet {
                name: name.to_string(),
            })
    }

    /// Every set to apply for `name`, prerequisites first, `name` last.
    ///
    /// Shared prerequisites appear once, at their first required position.
    pub fn resolve(&self, name: &str) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut visiting = Vec::new();
        self.visit(name, &mut visiting, &mut order)?;
        Ok(order)
    }

    fn visit(&self, name: &str, visiting: &mut Vec<String>, order: &mut Vec<String>) -> Result<()> {
        if order.iter().any(|n| n == name) {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|n| n == name) {
            let mut cycle: Vec<&str> = visiting[start..].iter().map(String::as_str).collect();
            cycle.push(name);
            return Err(Error::CycleDetected {
                cycle: cycle.join(" -> "),
            });
        }

        visiting.push(name.to_string());
        for required in self.requires(name)? {
            self.visit(required, visiting, order)?;
        }
        visiting.pop();
        order.push(name.to_string());
        Ok(())
    }
}

/// One exported commit of a patch set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    /// 1-based position within the set.
    pub sequence: u32,
    pub description: String,
    pub path: PathBuf,
}

impl PatchRecord {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn record_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4,})-(.+)\.patch$").expect("static pattern is valid"))
}

/// Sequence number and description of a `NNNN-<description>.patch` name.
pub fn parse_record_name(file_name: &str) -> Option<(u32, String)> {
    let captures = record_pattern().captures(file_name)?;
    let sequence = captures[1].parse().ok()?;
    Some((sequence, captures[2].to_string()))
}

/// The records of one patch set directory in ascending sequence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSeries {
    pub dir: PathBuf,
    pub records: Vec<PatchRecord>,
}

impl PatchSeries {
    /// Read and validate the records in `dir`.
    ///
    /// Files not named like records are ignored. Sequence numbers must run
    /// 1, 2, 3... without gaps or repeats.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut records = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some((sequence, description)) = parse_record_name(&name) {
                records.push(PatchRecord {
                    sequence,
                    description,
                    path: entry.path(),
                });
            }
        }
        records.sort_by_key(|r| r.sequence);

        for (expected, record) in (1u32..).zip(&records) {
            if record.sequence != expected {
                return Err(Error::PatchLayout {
                    path: dir.display().to_string(),
                    message: format!(
                        "expected record {:04}, found {}",
                        expected,
                        record.file_name()
                    ),
                });
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
