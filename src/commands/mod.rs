//! # CLI Command Implementations
//!
//! One file per subcommand, each with an `Args` struct derived with `clap`
//! and an `execute` function. Batch commands share the helpers below for
//! loading the configuration, selecting modules and reporting failures.

pub mod apply;
pub mod clean;
pub mod ls;
pub mod save;
pub mod update;

use anyhow::{Context, Result};

use patchstack::batch::BatchReport;
use patchstack::config::{self, Config};
use patchstack::output::{self, OutputConfig, Status};
use patchstack::registry::Module;

use crate::cli::GlobalArgs;

/// Load the configuration named by the global options.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    if !global.config.exists() {
        anyhow::bail!("Configuration file not found: {}", global.config.display());
    }
    config::from_file(&global.config)
        .with_context(|| format!("Failed to load config from {}", global.config.display()))
}

/// Modules selected by `--module`, or all of them, in configuration order.
pub fn selected_modules<'a>(config: &'a Config, global: &GlobalArgs) -> Result<Vec<&'a Module>> {
    Ok(config.registry.select(&global.modules)?)
}

/// Print failures and the summary line; fail the command if any module failed.
pub fn finish<T>(report: &BatchReport<T>, out: &OutputConfig, verb: &str) -> Result<()> {
    for failure in &report.failures {
        eprintln!(
            "{}",
            output::module_line(out, Status::Failed, &failure.module, &failure.error.to_string())
        );
    }
    println!("{}", output::summary(report.completed.len(), report.failures.len(), verb));

    if !report.is_success() {
        let names: Vec<&str> = report.failures.iter().map(|f| f.module.as_str()).collect();
        anyhow::bail!("{} failed for: {}", report.failures[0].operation, names.join(", "));
    }
    Ok(())
}

/// Abbreviated commit id for display.
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
