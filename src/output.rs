//! # Terminal Output
//!
//! Decides whether command output uses color and symbols, and renders the
//! per-module status lines the commands print.
//!
//! Color follows `--color=always|never|auto`. In auto mode it is off when
//! `NO_COLOR` is set, `CLICOLOR=0`, `TERM=dumb`, or stdout is not a terminal
//! (unless `CLICOLOR_FORCE` is set).

use std::env;

use console::style;

/// Output settings shared by every command of one invocation.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::terminal_wants_color(),
        };
        Self { use_color }
    }

    fn terminal_wants_color() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Outcome class of one module line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Failed,
}

impl Status {
    fn marker(self, config: &OutputConfig) -> String {
        let (symbol, plain) = match self {
            Status::Ok => ("✓", "[OK]"),
            Status::Warn => ("!", "[WARN]"),
            Status::Failed => ("✗", "[FAIL]"),
        };
        if !config.use_color {
            return plain.to_string();
        }
        match self {
            Status::Ok => style(symbol).green().to_string(),
            Status::Warn => style(symbol).yellow().to_string(),
            Status::Failed => style(symbol).red().to_string(),
        }
    }
}

/// `<marker> <module>: <detail>`
pub fn module_line(config: &OutputConfig, status: Status, module: &str, detail: &str) -> String {
    let name = if config.use_color {
        style(module).bold().to_string()
    } else {
        module.to_string()
    };
    format!("{} {}: {}", status.marker(config), name, detail)
}

/// One-line batch summary, e.g. `2 of 3 module(s) saved, 1 failed`.
pub fn summary(done: usize, failed: usize, verb: &str) -> String {
    let total = done + failed;
    if failed == 0 {
        format!("{} module(s) {}", total, verb)
    } else {
        format!("{} of {} module(s) {}, {} failed", done, total, verb, failed)
    }
}
