//! The narrow interface stockroom needs from a data versioning store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::types::Identity;

/// Errors returned by store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The commit database reported an error.
    #[error("store database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// An underlying IO operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Another handle holds the store environment.
    #[error("store at {0} is locked by another process")]
    Locked(PathBuf),
    /// The operation needs an initialized store.
    #[error("no store initialized at {0}")]
    NotInitialized(PathBuf),
    /// The environment was closed on this handle.
    #[error("store environment at {0} is closed")]
    Closed(PathBuf),
    /// A commit reference that the store does not know.
    #[error("unknown commit: {0}")]
    UnknownCommit(String),
    /// `init` was called on an existing store without `remove_old`.
    #[error("store already initialized at {0}")]
    AlreadyInitialized(PathBuf),
}

/// Metadata recorded for one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSpec {
    pub parent: Option<String>,
    pub message: String,
    pub user_name: String,
    pub user_email: String,
    pub commit_time: i64,
}

/// Snapshot of the store history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogContents {
    /// Current head commit, `None` before the first commit.
    pub head: Option<String>,
    /// Commits reachable from head, newest first.
    pub order: Vec<String>,
    /// Metadata for each commit in `order`.
    pub specs: BTreeMap<String, CommitSpec>,
}

/// A data versioning store rooted at a repository directory.
pub trait VersionStore: Sized {
    /// Get a handle on the store at `path`, whether or not one exists.
    /// Opening a path without a store writes nothing to disk.
    fn open_or_create(path: &Path) -> Result<Self, StoreError>;

    /// Directory the store was opened at.
    fn path(&self) -> &Path;

    /// Whether a store exists at `path`, open or not.
    fn is_initialized(&self) -> bool;

    /// Create a fresh store owned by `identity`. With `remove_old`, any
    /// existing store is discarded first.
    fn init(&mut self, identity: &Identity, remove_old: bool) -> Result<(), StoreError>;

    fn log(&self) -> Result<LogContents, StoreError>;

    /// Record a commit on top of the store's head and return its reference.
    fn commit(&mut self, message: &str) -> Result<String, StoreError>;

    /// Record a commit whose parent is `parent` (a root commit for `None`)
    /// and move the store's head to it.
    fn commit_on(&mut self, parent: Option<&str>, message: &str) -> Result<String, StoreError>;

    /// Release the environment so another process can open the store.
    /// Calling it twice is harmless.
    fn close_environment(&mut self);
}
