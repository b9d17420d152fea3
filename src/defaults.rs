//! Default values for patchstack configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".patchstack.yaml";

/// Default directory, relative to the configuration file, holding exported
/// patch sets.
pub const PATCHES_DIR: &str = "patches";

/// Name used as author and committer for backups, normalized history and
/// replayed records.
pub const SYNTHETIC_NAME: &str = "patchstack";

/// Email paired with [`SYNTHETIC_NAME`].
pub const SYNTHETIC_EMAIL: &str = "patchstack@localhost";

/// Prefix under which backup branches are created.
pub const BACKUP_PREFIX: &str = "backup/";

/// How many suffixed candidates are tried before a backup name is considered
/// taken.
pub const BACKUP_NAME_ATTEMPTS: u32 = 16;

/// Patch sets used when the configuration does not declare any, as
/// `(name, prerequisites)` pairs.
///
/// `specific` and `specific2` are alternative layers over `generic`.
pub const PATCH_SETS: &[(&str, &[&str])] = &[
    ("generic", &[]),
    ("specific", &["generic"]),
    ("specific2", &["generic"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patch_sets_start_with_generic() {
        assert_eq!(PATCH_SETS[0].0, "generic");
        assert!(PATCH_SETS[0].1.is_empty());
    }

    #[test]
    fn test_backup_prefix_is_a_ref_namespace() {
        assert!(BACKUP_PREFIX.ends_with('/'));
        assert!(!BACKUP_PREFIX.starts_with('/'));
    }
}
