//! # patchstack
//!
//! Keeps a set of vendored git modules pinned to known revisions and carries
//! local modifications on top of them as named, layered patch sets.
//!
//! ## Core Concepts
//!
//! - **Modules (`registry`, `config`)**: each module is an upstream repository
//!   with a tracked branch, a pinned revision and a working-copy directory,
//!   declared in `.patchstack.yaml`.
//! - **Patch sets (`patchset`)**: named layers such as `generic` and
//!   `specific`. A set may require other sets, which are applied first. In a
//!   module's history each set ends at a tag of the same name.
//! - **Backend (`backend`, `git`)**: the version-control operations the core
//!   needs, behind a trait so the state machines can be tested without git.
//!
//! ## Operations
//!
//! 1.  **Synchronize (`sync`)**: clone or reset a module to its pin, saving
//!     any local state on a backup branch first.
//! 2.  **Save (`save`)**: split the history above the pin at the tags and
//!     export each set as numbered patch files, after normalizing committer
//!     metadata so unchanged history saves to identical bytes.
//! 3.  **Apply (`replay`)**: replay a set and its prerequisites onto a
//!     checkout, reproducing the saved commits.
//!
//! `batch` runs any of these over many modules, collecting per-module
//! failures instead of stopping at the first one.

pub mod backend;
pub mod batch;
pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod output;
pub mod patchset;
pub mod registry;
pub mod replay;
pub mod save;
pub mod sync;

mod segment_proptest;
