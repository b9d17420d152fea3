//! # Clean Command Implementation
//!
//! Deletes the `backup/...` branches that `update` leaves behind in each
//! present module. The checked-out branch is never deleted; modules that
//! have not been cloned are skipped.

use anyhow::Result;
use clap::Args;

use patchstack::backend::GitBackend;
use patchstack::batch;
use patchstack::output::{self, Status};
use patchstack::sync;

use super::{finish, load_config, selected_modules};
use crate::cli::GlobalArgs;

/// Delete backup branches created by update
#[derive(Args, Debug)]
pub struct CleanArgs {}

/// Execute the `clean` command.
pub fn execute(_args: CleanArgs, global: &GlobalArgs) -> Result<()> {
    let out = global.output();
    let config = load_config(global)?;
    let present: Vec<_> = selected_modules(&config, global)?
        .into_iter()
        .filter(|m| m.path.exists())
        .collect();

    let report = batch::run(&present, "clean", false, |module| {
        sync::clean(&GitBackend::new(&module.path), module)
    });

    for (module, deleted) in &report.completed {
        let detail = if deleted.is_empty() {
            "no backup branches".to_string()
        } else {
            format!("deleted {}", deleted.join(", "))
        };
        println!("{}", output::module_line(&out, Status::Ok, module, &detail));
    }
    finish(&report, &out, "cleaned")
}
