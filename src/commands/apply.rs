//! # Apply Command Implementation
//!
//! Replays a patch set, and every set it requires, onto each selected
//! module's current checkout. Run `update` first to start from the pin.
//!
//! A module whose record fails to apply is left mid-replay for manual
//! resolution; the remaining modules are still processed.

use anyhow::Result;
use clap::Args;

use patchstack::backend::GitBackend;
use patchstack::batch;
use patchstack::output::{self, Status};
use patchstack::replay::{self, ApplyReport};

use super::{finish, load_config, selected_modules};
use crate::cli::GlobalArgs;

/// Apply a patch set and its prerequisites
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Patch set to apply, e.g. generic or specific
    #[arg(value_name = "PATCH_SET")]
    pub patch_set: String,
}

fn describe(report: &ApplyReport) -> String {
    if report.applied.is_empty() {
        return "nothing to apply".to_string();
    }
    let sets: Vec<String> = report
        .applied
        .iter()
        .map(|s| format!("{} ({})", s.name, s.records))
        .collect();
    format!("applied {}", sets.join(", "))
}

/// Execute the `apply` command.
pub fn execute(args: ApplyArgs, global: &GlobalArgs) -> Result<()> {
    let out = global.output();
    let config = load_config(global)?;
    // Unknown names fail before any module is touched.
    config.chain.resolve(&args.patch_set)?;
    let modules = selected_modules(&config, global)?;

    let report = batch::run(&modules, "apply", false, |module| {
        replay::apply(
            &GitBackend::new(&module.path),
            module,
            &config.chain,
            &config.patches_root,
            &args.patch_set,
        )
    });

    for (module, applied) in &report.completed {
        println!("{}", output::module_line(&out, Status::Ok, module, &describe(applied)));
    }
    finish(&report, &out, "patched")
}
