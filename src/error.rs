//! # Error Handling
//!
//! This module defines the centralized error type for `patchstack`. It uses
//! the `thiserror` library to build one `Error` enum that covers every
//! failure the library can report, each with enough context to tell the
//! operator which module failed and at which step.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Module-scoped variants carry the module name,
//!   so a batch summary can print them without extra wrapping.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The variants fall into three groups:
//!
//! - Synchronization failures: `InvalidModule`, `CloneFailed`,
//!   `BackupFailed`, `NamingCollision`.
//! - Segmentation and replay failures: `AnchorNotAncestor`, `MissingTag`,
//!   `ApplyConflict`, `ApplyInProgress`, `PatchLayout`.
//! - Configuration and plumbing: `ConfigParse`, `UnknownModule`,
//!   `UnknownPatchSet`, `CycleDetected`, `GitCommand`, and wrapped I/O and
//!   YAML errors.

use thiserror::Error;

/// Main error type for patchstack operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be parsed or failed validation.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A module's path exists but is not the root of a git repository.
    #[error("Invalid module {module}: {path} exists but is not a git repository")]
    InvalidModule { module: String, path: String },

    /// A tag marker does not descend from the module's pinned revision.
    ///
    /// This means the patch set was recorded against an older anchor and its
    /// range cannot be computed safely.
    #[error("Module {module}: tag '{tag}' is not a descendant of pinned revision {anchor}")]
    AnchorNotAncestor {
        module: String,
        anchor: String,
        tag: String,
    },

    /// A tag marker the operation needs could not be found.
    #[error("Module {module}: missing tag '{tag}'")]
    MissingTag { module: String, tag: String },

    /// Cloning a module from its source failed.
    #[error("Module {module}: clone of {url} failed: {message}")]
    CloneFailed {
        module: String,
        url: String,
        message: String,
    },

    /// Preserving local state failed, so the destructive step was not run.
    #[error("Module {module}: backup failed during {step}: {message}")]
    BackupFailed {
        module: String,
        step: String,
        message: String,
    },

    /// A patch record no longer applies to the module's checkout.
    #[error("Module {module}: patch set '{patch_set}' stopped at {record}: {message}")]
    ApplyConflict {
        module: String,
        patch_set: String,
        record: String,
        message: String,
    },

    /// A previous replay stopped part-way and its session is still pending.
    #[error("Module {module}: an interrupted patch application is pending in {path}; run update to reset it")]
    ApplyInProgress { module: String, path: String },

    /// No unique backup branch name could be produced.
    #[error("Module {module}: backup branch name '{name}' is already taken")]
    NamingCollision { module: String, name: String },

    /// A module name was requested that the configuration does not declare.
    #[error("Unknown module: {name}")]
    UnknownModule { name: String },

    /// A patch set was requested that the configuration does not declare.
    #[error("Unknown patch set: {name}")]
    UnknownPatchSet { name: String },

    /// The declared patch-set prerequisites form a loop.
    #[error("Cycle detected in patch set prerequisites: {cycle}")]
    CycleDetected { cycle: String },

    /// Records in a patch set directory are malformed or not densely numbered.
    #[error("Invalid patch layout in {path}: {message}")]
    PatchLayout { path: String, message: String },

    /// A git command exited unsuccessfully.
    #[error("Git command failed in {path}: git {command} - {stderr}")]
    GitCommand {
        command: String,
        path: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Name of the module this error concerns, when it is module-scoped.
    pub fn module(&self) -> Option<&str> {
        match self {
            Error::InvalidModule { module, .. }
            | Error::AnchorNotAncestor { module, .. }
            | Error::MissingTag { module, .. }
            | Error::CloneFailed { module, .. }
            | Error::BackupFailed { module, .. }
            | Error::ApplyConflict { module, .. }
            | Error::ApplyInProgress { module, .. }
            | Error::NamingCollision { module, .. } => Some(module),
            _ => None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "Missing url field".to_string(),
            hint: Some("Add 'url:' to module 'libfoo'".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("Missing url field"));
        assert!(display.contains("hint:"));
        assert!(display.contains("module 'libfoo'"));
    }

    #[test]
    fn test_error_display_config_parse_without_hint() {
        let error = Error::ConfigParse {
            message: "Invalid YAML".to_string(),
            hint: None,
        };
        assert!(!format!("{}", error).contains("hint:"));
    }

    #[test]
    fn test_error_display_anchor_not_ancestor() {
        let error = Error::AnchorNotAncestor {
            module: "libfoo".to_string(),
            anchor: "abc123".to_string(),
            tag: "generic".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("libfoo"));
        assert!(display.contains("'generic'"));
        assert!(display.contains("abc123"));
    }

    #[test]
    fn test_error_display_backup_failed_names_step() {
        let error = Error::BackupFailed {
            module: "libfoo".to_string(),
            step: "commit".to_string(),
            message: "index.lock exists".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("backup failed during commit"));
        assert!(display.contains("index.lock exists"));
    }

    #[test]
    fn test_error_display_apply_conflict() {
        let error = Error::ApplyConflict {
            module: "libfoo".to_string(),
            patch_set: "specific".to_string(),
            record: "0002-Tune-defaults.patch".to_string(),
            message: "patch does not apply".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("'specific'"));
        assert!(display.contains("0002-Tune-defaults.patch"));
    }

    #[test]
    fn test_error_display_apply_in_progress() {
        let error = Error::ApplyInProgress {
            module: "libfoo".to_string(),
            path: "/tmp/libfoo".to_string(),
        };
        assert_eq!(error.module(), Some("libfoo"));
        assert!(format!("{}", error).contains("run update"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "merge-base --is-ancestor a b".to_string(),
            path: "/tmp/libfoo".to_string(),
            stderr: "Not a valid object name a".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("git merge-base"));
        assert!(display.contains("/tmp/libfoo"));
    }

    #[test]
    fn test_module_accessor() {
        let scoped = Error::MissingTag {
            module: "libfoo".to_string(),
            tag: "generic".to_string(),
        };
        assert_eq!(scoped.module(), Some("libfoo"));

        let unscoped = Error::UnknownPatchSet {
            name: "nope".to_string(),
        };
        assert_eq!(unscoped.module(), None);
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }
}
