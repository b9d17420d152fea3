//! # Update Command Implementation
//!
//! Brings every selected module to its pinned revision: missing modules are
//! cloned, existing ones are reset to the upstream tip of their branch and
//! then checked out at the pin.
//!
//! Local state of an existing working copy is saved on a `backup/...` branch
//! first. `--no-backup` discards it instead; untracked files survive either
//! way since the reset only touches tracked content.

use anyhow::Result;
use clap::Args;

use patchstack::backend::GitBackend;
use patchstack::batch;
use patchstack::output::{self, Status};
use patchstack::sync::{self, SyncAction, SyncOutcome};

use super::{finish, load_config, selected_modules, short_id};
use crate::cli::GlobalArgs;

/// Clone or reset modules to their pinned revisions
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Discard local changes instead of saving them on a backup branch
    #[arg(long)]
    pub no_backup: bool,

    /// Update modules concurrently
    #[arg(long)]
    pub parallel: bool,
}

fn describe(outcome: &SyncOutcome) -> String {
    let action = match &outcome.action {
        SyncAction::Cloned => "cloned".to_string(),
        SyncAction::BackedUp {
            branch,
            committed_changes: true,
        } => format!("local changes committed to {}", branch),
        SyncAction::BackedUp { branch, .. } => format!("previous state kept on {}", branch),
        SyncAction::ResetWithoutBackup => "local changes discarded".to_string(),
    };
    let position = if outcome.detached {
        format!("detached at {}", short_id(&outcome.head))
    } else {
        format!("at {}", short_id(&outcome.head))
    };
    format!("{}, {}", action, position)
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, global: &GlobalArgs) -> Result<()> {
    let out = global.output();
    let config = load_config(global)?;
    let modules = selected_modules(&config, global)?;

    let allow_backup = !args.no_backup;
    let report = batch::run(&modules, "update", args.parallel, |module| {
        sync::sync(&GitBackend::new(&module.path), module, allow_backup)
    });

    for (module, outcome) in &report.completed {
        let status = match outcome.action {
            SyncAction::ResetWithoutBackup => Status::Warn,
            _ => Status::Ok,
        };
        println!("{}", output::module_line(&out, status, module, &describe(outcome)));
    }
    finish(&report, &out, "updated")
}
