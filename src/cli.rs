//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use patchstack::defaults::CONFIG_FILE;
use patchstack::output::OutputConfig;

use crate::commands;

/// patchstack - Keep vendored modules pinned and layer named patch sets on top
#[derive(Parser, Debug)]
#[command(name = "patchstack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "PATCHSTACK_CONFIG",
        default_value = CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Restrict the command to this module (repeatable)
    #[arg(short, long = "module", global = true, value_name = "NAME")]
    pub modules: Vec<String>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl GlobalArgs {
    pub fn output(&self) -> OutputConfig {
        OutputConfig::from_env_and_flag(&self.color)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone or reset every module to its pinned revision
    Update(commands::update::UpdateArgs),

    /// Delete backup branches created by update
    Clean(commands::clean::CleanArgs),

    /// Export each module's tagged patch sets as patch files
    Save(commands::save::SaveArgs),

    /// Apply a patch set and its prerequisites to every module
    Apply(commands::apply::ApplyArgs),

    /// Show module checkouts and the patch sets on disk
    Ls(commands::ls::LsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let env = env_logger::Env::default().default_filter_or(self.global.log_level.as_str());
        env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .init();

        match self.command {
            Commands::Update(args) => commands::update::execute(args, &self.global),
            Commands::Clean(args) => commands::clean::execute(args, &self.global),
            Commands::Save(args) => commands::save::execute(args, &self.global),
            Commands::Apply(args) => commands::apply::execute(args, &self.global),
            Commands::Ls(args) => commands::ls::execute(args, &self.global),
        }
    }
}
