//! Module descriptors and the registry that holds them.
//!
//! The registry is built once from configuration and handed to the core by
//! reference. Nothing in the core mutates it; per-module state lives in the
//! working copies themselves.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A third-party repository tracked at a pinned revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Unique name used on the command line and in reports.
    pub name: String,
    /// Clone location (URL or local path).
    pub source: String,
    /// Upstream branch the module follows.
    pub branch: String,
    /// Commit the module is synchronized to; the anchor for patch sets.
    pub pinned_revision: String,
    /// Working-copy directory as written in the configuration. Also names
    /// the module's directory under the patches root.
    pub directory: String,
    /// Absolute working-copy location.
    pub path: PathBuf,
}

impl Module {
    /// Directory holding this module's exported patch sets.
    pub fn patches_dir(&self, patches_root: &Path) -> PathBuf {
        patches_root.join(&self.directory)
    }

    /// Directory holding one exported patch set of this module.
    pub fn patch_set_dir(&self, patches_root: &Path, patch_set: &str) -> PathBuf {
        self.patches_dir(patches_root).join(patch_set)
    }
}

/// Modules in configuration order, addressable by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    /// Build a registry, rejecting duplicate names and duplicate paths.
    pub fn new(modules: Vec<Module>) -> Result<Self> {
        for (i, module) in modules.iter().enumerate() {
            for earlier in &modules[..i] {
                if earlier.name == module.name {
                    return Err(Error::ConfigParse {
                        message: format!("Duplicate module name '{}'", module.name),
                        hint: Some("Module names must be unique".to_string()),
                    });
                }
                if earlier.path == module.path {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "Modules '{}' and '{}' share the directory {}",
                            earlier.name,
                            module.name,
                            module.path.display()
                        ),
                        hint: Some("Each module needs its own working copy".to_string()),
                    });
                }
            }
        }
        Ok(Self { modules })
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The modules named in `names`, in configuration order; all modules
    /// when `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Module>> {
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(Error::UnknownModule {
                name: unknown.clone(),
            });
        }
        Ok(self
            .modules
            .iter()
            .filter(|m| names.is_empty() || names.contains(&m.name))
            .collect())
    }
}
