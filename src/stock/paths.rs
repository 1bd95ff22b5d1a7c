//! Stock repository path layout
//!
//! This module provides the `StockPaths` struct which names every path of a
//! managed repository:
//!
//! ```text
//! <root>/
//! ├── head.stock          # Current store commit (git tracked)
//! ├── .gitignore          # Contains the hangar ignore block
//! ├── .git/               # Git marker, owned by git
//! └── .hangar/            # Data store, ignored by git
//!     ├── store.db        # SQLite commit log
//!     └── env.lock        # flock held while the store is open
//! ```

use std::path::{Path, PathBuf};

/// File holding the current commit reference.
pub const HEAD_FILE: &str = "head.stock";
/// Directory owned by the data store.
pub const STORE_DIR: &str = ".hangar";
/// Git repository marker.
pub const GIT_DIR: &str = ".git";
/// Git ignore file.
pub const GITIGNORE: &str = ".gitignore";

/// Manages all filesystem paths for a stock repository
#[derive(Debug, Clone)]
pub struct StockPaths {
    root: PathBuf,
}

impl StockPaths {
    /// Creates a new StockPaths for the given repository root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the head file path: `{root}/head.stock`
    pub fn head_file(&self) -> PathBuf {
        self.root.join(HEAD_FILE)
    }

    /// Returns the git marker path: `{root}/.git`
    pub fn git_dir(&self) -> PathBuf {
        self.root.join(GIT_DIR)
    }

    /// Returns the git ignore file path: `{root}/.gitignore`
    pub fn gitignore(&self) -> PathBuf {
        self.root.join(GITIGNORE)
    }

    /// Returns the store directory path: `{root}/.hangar`
    pub fn store_dir(&self) -> PathBuf {
        self.root.join(STORE_DIR)
    }

    /// Returns the store database path: `{root}/.hangar/store.db`
    pub fn store_db(&self) -> PathBuf {
        self.store_dir().join("store.db")
    }

    /// Returns the store environment lock path: `{root}/.hangar/env.lock`
    pub fn store_lock(&self) -> PathBuf {
        self.store_dir().join("env.lock")
    }

    pub fn has_head_file(&self) -> bool {
        self.head_file().exists()
    }

    pub fn has_git(&self) -> bool {
        self.git_dir().exists()
    }

    pub fn has_store(&self) -> bool {
        self.store_dir().exists()
    }
}
