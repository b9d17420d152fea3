//! # Ls Command Implementation
//!
//! Read-only overview of every selected module: whether its working copy
//! exists, where `HEAD` points relative to the pin, and which patch sets are
//! saved for it on disk with their record counts.

use std::fs;

use anyhow::Result;
use clap::Args;

use patchstack::backend::{Backend, GitBackend};
use patchstack::config::Config;
use patchstack::output::{self, Status};
use patchstack::patchset::PatchSeries;
use patchstack::registry::Module;

use super::{load_config, selected_modules, short_id};
use crate::cli::GlobalArgs;

/// Show module checkouts and the patch sets on disk
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Only print module names
    #[arg(short, long)]
    pub quiet: bool,
}

/// Where a module's working copy stands.
#[derive(Debug, PartialEq, Eq)]
enum Checkout {
    Missing,
    NotRepository,
    At(String),
}

fn inspect_checkout(backend: &dyn Backend) -> Checkout {
    if !backend.path().exists() {
        return Checkout::Missing;
    }
    if !backend.is_repository() {
        return Checkout::NotRepository;
    }
    match backend.rev_parse("HEAD") {
        Ok(head) => Checkout::At(head),
        Err(_) => Checkout::NotRepository,
    }
}

/// Patch sets saved for `module`, in chain order, with their record counts.
///
/// Directories that fail validation are listed with their error.
fn saved_sets(config: &Config, module: &Module) -> Vec<(String, Result<usize, String>)> {
    config
        .chain
        .names()
        .filter_map(|name| {
            let dir = module.patch_set_dir(&config.patches_root, name);
            if !dir.is_dir() {
                return None;
            }
            let count = PatchSeries::load(&dir)
                .map(|s| s.len())
                .map_err(|e| e.to_string());
            Some((name.to_string(), count))
        })
        .collect()
}

/// Extra directories under the module's patch root that are not declared sets.
fn undeclared_dirs(config: &Config, module: &Module) -> Vec<String> {
    let root = module.patches_dir(&config.patches_root);
    let Ok(entries) = fs::read_dir(&root) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| !config.chain.contains(n))
        .collect();
    names.sort();
    names
}

fn describe(module: &Module, checkout: &Checkout, sets: &[(String, Result<usize, String>)]) -> (Status, String) {
    let (status, position) = match checkout {
        Checkout::Missing => (Status::Warn, "not cloned".to_string()),
        Checkout::NotRepository => (Status::Failed, "not a git repository".to_string()),
        Checkout::At(head) if head.starts_with(&module.pinned_revision) => {
            (Status::Ok, format!("at pin {}", short_id(head)))
        }
        Checkout::At(head) => (
            Status::Ok,
            format!("HEAD {} (pin {})", short_id(head), short_id(&module.pinned_revision)),
        ),
    };

    let saved = if sets.is_empty() {
        "no saved patch sets".to_string()
    } else {
        sets.iter()
            .map(|(name, count)| match count {
                Ok(n) => format!("{} ({})", name, n),
                Err(e) => format!("{} (invalid: {})", name, e),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    (status, format!("{}; {}", position, saved))
}

fn print_module(config: &Config, module: &Module, out: &output::OutputConfig) {
    let checkout = inspect_checkout(&GitBackend::new(&module.path));
    let sets = saved_sets(config, module);
    let (status, detail) = describe(module, &checkout, &sets);
    println!("{}", output::module_line(out, status, &module.name, &detail));

    for name in undeclared_dirs(config, module) {
        println!("    undeclared patch directory: {}", name);
    }
}

/// Execute the `ls` command.
pub fn execute(args: LsArgs, global: &GlobalArgs) -> Result<()> {
    let out = global.output();
    let config = load_config(global)?;
    let modules = selected_modules(&config, global)?;

    if args.quiet {
        for module in modules {
            println!("{}", module.name);
        }
        return Ok(());
    }

    for module in &modules {
        print_module(&config, module, &out);
    }
    if modules.is_empty() {
        println!("No modules configured in {}", global.config.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchstack::config;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
modules:
  - name: libfoo
    url: https://example.com/libfoo.git
    branch: main
    commit: 0123456789abcdef
    directory: vendor/libfoo
"#;

    #[test]
    fn test_missing_checkout() {
        let temp = TempDir::new().unwrap();
        let config = config::parse(CONFIG, temp.path()).unwrap();
        let module = config.registry.get("libfoo").unwrap();

        let checkout = inspect_checkout(&GitBackend::new(&module.path));
        assert_eq!(checkout, Checkout::Missing);
        let (status, detail) = describe(module, &checkout, &[]);
        assert_eq!(status, Status::Warn);
        assert_eq!(detail, "not cloned; no saved patch sets");
    }

    #[test]
    fn test_plain_directory_is_not_repository() {
        let temp = TempDir::new().unwrap();
        let config = config::parse(CONFIG, temp.path()).unwrap();
        let module = config.registry.get("libfoo").unwrap();
        fs::create_dir_all(&module.path).unwrap();

        // A temp dir can sit inside another repository; only the module root counts.
        let checkout = inspect_checkout(&GitBackend::new(&module.path));
        assert_eq!(checkout, Checkout::NotRepository);
    }

    #[test]
    fn test_saved_sets_in_chain_order() {
        let temp = TempDir::new().unwrap();
        let config = config::parse(CONFIG, temp.path()).unwrap();
        let module = config.registry.get("libfoo").unwrap();

        let specific = module.patch_set_dir(&config.patches_root, "specific");
        let generic = module.patch_set_dir(&config.patches_root, "generic");
        let stray = module.patches_dir(&config.patches_root).join("old");
        for dir in [&specific, &generic, &stray] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(generic.join("0001-a.patch"), "a").unwrap();
        fs::write(generic.join("0002-b.patch"), "b").unwrap();
        fs::write(specific.join("0002-gap.patch"), "c").unwrap();

        let sets = saved_sets(&config, module);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0], ("generic".to_string(), Ok(2)));
        assert_eq!(sets[1].0, "specific");
        assert!(sets[1].1.is_err());
        assert_eq!(undeclared_dirs(&config, module), vec!["old"]);

        let checkout = Checkout::At("0123456789abcdef".to_string());
        let (_, detail) = describe(module, &checkout, &sets[..1]);
        assert_eq!(detail, "at pin 0123456789ab; generic (2)");
    }
}
