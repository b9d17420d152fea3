//! # patchstack CLI
//!
//! Binary entry point. Parses arguments with `clap`, initializes logging and
//! dispatches to the subcommand. All synchronization, segmentation and replay
//! logic lives in the library crate; the binary only selects modules and
//! prints results.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
