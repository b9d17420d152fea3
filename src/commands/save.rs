//! # Save Command Implementation
//!
//! Exports every selected module's tagged patch sets into the patches
//! directory, replacing what was there. Committer metadata in each module is
//! normalized first so an unchanged history always saves to identical files.
//!
//! A module that skipped a corrupt tag marker keeps the sets it did export
//! but still counts as failed.

use anyhow::Result;
use clap::Args;

use patchstack::backend::GitBackend;
use patchstack::batch::{self, BatchReport, ModuleFailure};
use patchstack::output::{self, Status};
use patchstack::save::{self, SaveReport};

use super::{finish, load_config, selected_modules};
use crate::cli::GlobalArgs;

/// Export tagged patch sets as patch files
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Export only the most recent patch set, covering everything since the pin
    #[arg(long)]
    pub one: bool,

    /// Save modules concurrently
    #[arg(long)]
    pub parallel: bool,
}

fn describe(report: &SaveReport) -> String {
    let sets: Vec<String> = report
        .sets
        .iter()
        .rev()
        .map(|s| format!("{} ({})", s.range.name, s.records.len()))
        .collect();
    let mut detail = format!("saved {}", sets.join(", "));
    if report.normalized > 0 {
        detail.push_str(&format!("; normalized {} commit(s)", report.normalized));
    }
    detail
}

/// Move modules with skipped sets from the completed list to the failures.
fn fail_skipped_sets(report: &mut BatchReport<SaveReport>) {
    for (module, mut saved) in std::mem::take(&mut report.completed) {
        if saved.skipped.is_empty() {
            report.completed.push((module, saved));
            continue;
        }
        for error in saved.skipped.drain(..) {
            report.failures.push(ModuleFailure {
                module: module.clone(),
                operation: "save",
                error,
            });
        }
    }
}

/// Execute the `save` command.
pub fn execute(args: SaveArgs, global: &GlobalArgs) -> Result<()> {
    let out = global.output();
    let config = load_config(global)?;
    let modules = selected_modules(&config, global)?;

    let mut report = batch::run(&modules, "save", args.parallel, |module| {
        save::save(
            &GitBackend::new(&module.path),
            module,
            &config.chain,
            &config.patches_root,
            args.one,
        )
    });

    for (module, saved) in &report.completed {
        let status = if saved.skipped.is_empty() {
            Status::Ok
        } else {
            Status::Warn
        };
        println!("{}", output::module_line(&out, status, module, &describe(saved)));
    }
    fail_skipped_sets(&mut report);
    finish(&report, &out, "saved")
}
