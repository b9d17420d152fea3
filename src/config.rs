//! # Configuration Schema and Parsing
//!
//! This module defines the `.patchstack.yaml` file: the modules to track and
//! the patch sets layered on top of them. Loading produces a [`Config`] with
//! a validated [`ModuleRegistry`] and [`PatchSetChain`].
//!
//! ## Format
//!
//! ```yaml
//! patches_dir: patches
//! patch_sets:
//!   - name: generic
//!   - name: specific
//!     requires: [generic]
//! modules:
//!   - name: libfoo
//!     url: https://example.com/libfoo.git
//!     branch: main
//!     commit: 0123abcd
//!     directory: vendor/libfoo
//! ```
//!
//! `patches_dir` and `patch_sets` are optional. Relative paths resolve
//! against the directory containing the configuration file.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::patchset::{PatchSetChain, PatchSetDecl};
use crate::registry::{Module, ModuleRegistry};

/// One entry of the `modules` list as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    /// Unique module name.
    pub name: String,
    /// Clone location.
    pub url: String,
    /// Upstream branch to follow.
    pub branch: String,
    /// Commit to pin the module to.
    pub commit: String,
    /// Working-copy directory, relative to the configuration file.
    pub directory: String,
}

/// The configuration file as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Where exported patch sets live, relative to the configuration file.
    #[serde(default)]
    pub patches_dir: Option<String>,
    /// Declared patch sets; the generic/specific/specific2 chain if omitted.
    #[serde(default)]
    pub patch_sets: Option<Vec<PatchSetDecl>>,
    pub modules: Vec<ModuleEntry>,
}

/// Loaded and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the configuration file lives in.
    pub base_dir: PathBuf,
    /// Absolute root of exported patch sets.
    pub patches_root: PathBuf,
    pub chain: PatchSetChain,
    pub registry: ModuleRegistry,
}

fn check_relative(field: &str, module: &str, value: &str) -> Result<()> {
    let path = Path::new(value);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if value.trim().is_empty() || escapes {
        return Err(Error::ConfigParse {
            message: format!("Invalid {} '{}' for module '{}'", field, value, module),
            hint: Some(format!(
                "'{}' must be a relative path inside the configuration directory without '..'",
                field
            )),
        });
    }
    Ok(())
}

fn check_present(field: &str, module: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ConfigParse {
            message: format!("Empty '{}' for module '{}'", field, module),
            hint: Some(format!("Add '{}:' to the module entry", field)),
        });
    }
    Ok(())
}

/// Parse configuration text, resolving relative paths against `base_dir`.
pub fn parse(yaml_content: &str, base_dir: &Path) -> Result<Config> {
    let file: ConfigFile = serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some("Expected top-level 'modules:' with name, url, branch, commit and directory".to_string()),
    })?;

    let chain = match file.patch_sets {
        Some(sets) if !sets.is_empty() => PatchSetChain::new(sets)?,
        _ => PatchSetChain::default(),
    };

    let patches_dir = file
        .patches_dir
        .unwrap_or_else(|| defaults::PATCHES_DIR.to_string());
    let patches_root = base_dir.join(&patches_dir);

    let mut modules = Vec::with_capacity(file.modules.len());
    for entry in file.modules {
        check_present("name", &entry.name, &entry.name)?;
        check_present("url", &entry.name, &entry.url)?;
        check_present("branch", &entry.name, &entry.branch)?;
        check_present("commit", &entry.name, &entry.commit)?;
        check_relative("directory", &entry.name, &entry.directory)?;

        modules.push(Module {
            path: base_dir.join(&entry.directory),
            name: entry.name,
            source: entry.url,
            branch: entry.branch,
            pinned_revision: entry.commit,
            directory: entry.directory,
        });
    }

    Ok(Config {
        base_dir: base_dir.to_path_buf(),
        patches_root,
        chain,
        registry: ModuleRegistry::new(modules)?,
    })
}

/// Load the configuration file at `path`.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let base_dir = std::path::absolute(parent)?;
    parse(&content, &base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
modules:
  - name: libfoo
    url: https://example.com/libfoo.git
    branch: main
    commit: 0123abcd
    directory: vendor/libfoo
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse(MINIMAL, Path::new("/work")).unwrap();
        assert_eq!(config.registry.len(), 1);
        assert_eq!(config.patches_root, PathBuf::from("/work/patches"));

        let module = config.registry.get("libfoo").unwrap();
        assert_eq!(module.source, "https://example.com/libfoo.git");
        assert_eq!(module.pinned_revision, "0123abcd");
        assert_eq!(module.path, PathBuf::from("/work/vendor/libfoo"));
        assert_eq!(config.chain, PatchSetChain::default());
    }

    #[test]
    fn test_parse_custom_chain_and_patches_dir() {
        let yaml = r#"
patches_dir: local/patches
patch_sets:
  - name: base
  - name: board
    requires: [base]
modules: []
"#;
        let config = parse(yaml, Path::new("/work")).unwrap();
        assert_eq!(config.patches_root, PathBuf::from("/work/local/patches"));
        assert_eq!(config.chain.resolve("board").unwrap(), vec!["base", "board"]);
        assert!(!config.chain.contains("generic"));
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let yaml = r#"
modules:
  - name: libfoo
    url: u
    branch: main
    commit: c
    directory: d
    ref: main
"#;
        let err = parse(yaml, Path::new("/work")).unwrap_err();
        assert!(err.to_string().contains("Configuration parsing error"));
    }

    #[test]
    fn test_parse_rejects_empty_commit() {
        let yaml = r#"
modules:
  - name: libfoo
    url: u
    branch: main
    commit: ""
    directory: d
"#;
        let err = parse(yaml, Path::new("/work")).unwrap_err();
        assert!(err.to_string().contains("Empty 'commit' for module 'libfoo'"));
    }

    #[test]
    fn test_parse_rejects_escaping_directory() {
        for directory in ["../outside", "/abs/path", ""] {
            let yaml = format!(
                "modules:\n  - name: m\n    url: u\n    branch: main\n    commit: c\n    directory: \"{}\"\n",
                directory
            );
            let err = parse(&yaml, Path::new("/work")).unwrap_err();
            assert!(
                err.to_string().contains("Invalid directory"),
                "directory {:?} should be rejected, got {}",
                directory,
                err
            );
        }
    }

    #[test]
    fn test_parse_rejects_cyclic_chain() {
        let yaml = r#"
patch_sets:
  - name: a
    requires: [b]
  - name: b
    requires: [a]
modules: []
"#;
        let err = parse(yaml, Path::new("/work")).unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
    }

    #[test]
    fn test_from_file_resolves_against_config_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(".patchstack.yaml");
        fs::write(&config_path, MINIMAL).unwrap();

        let config = from_file(&config_path).unwrap();
        assert_eq!(config.base_dir, temp.path());
        assert_eq!(
            config.registry.get("libfoo").unwrap().path,
            temp.path().join("vendor/libfoo")
        );
    }

    #[test]
    fn test_from_file_missing() {
        let err = from_file("/nonexistent/.patchstack.yaml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
