//! # Batch Execution
//!
//! Runs one operation over a set of modules. A failing module does not stop
//! the rest: every failure is collected with the module name and reported
//! together at the end.
//!
//! With `parallel` set, modules run concurrently on the rayon thread pool.
//! Each module gets its own backend session, so no working copy is touched
//! by two operations at once. Results are kept in configuration order
//! either way.

use std::fmt;

use log::error;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::registry::Module;

/// One module's failure within a batch.
#[derive(Debug)]
pub struct ModuleFailure {
    pub module: String,
    pub operation: &'static str,
    pub error: Error,
}

impl fmt::Display for ModuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for {}: {}", self.operation, self.module, self.error)
    }
}

/// Per-module results of one batch, in configuration order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub completed: Vec<(String, T)>,
    pub failures: Vec<ModuleFailure>,
}

impl<T> BatchReport<T> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run `operation` on every module in `modules`.
pub fn run<T, F>(modules: &[&Module], operation: &'static str, parallel: bool, f: F) -> BatchReport<T>
where
    T: Send,
    F: Fn(&Module) -> Result<T> + Sync + Send,
{
    let outcomes: Vec<(String, Result<T>)> = if parallel {
        modules
            .par_iter()
            .map(|m| (m.name.clone(), f(m)))
            .collect()
    } else {
        modules.iter().map(|m| (m.name.clone(), f(m))).collect()
    };

    let mut report = BatchReport {
        completed: Vec::new(),
        failures: Vec::new(),
    };
    for (module, outcome) in outcomes {
        match outcome {
            Ok(value) => report.completed.push((module, value)),
            Err(e) => {
                let failure = ModuleFailure {
                    module,
                    operation,
                    error: e,
                };
                error!("{}", failure);
                report.failures.push(failure);
            }
        }
    }
    report
}
