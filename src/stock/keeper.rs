//! Bootstrapping a stock repository
//!
//! `init_repo` turns a git work tree into a stock repository: it creates or
//! adopts the data store, writes `head.stock` and makes git ignore the store.
//! Running it again is safe; an existing head file is never touched.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::head::set_current_head;
use super::ignore::ensure_store_ignored;
use super::StockPaths;
use crate::store::{StoreError, VersionStore};
use crate::types::Identity;

/// Errors returned by stock repository operations.
#[derive(Error, Debug)]
pub enum StockError {
    /// Bootstrap was attempted outside a git work tree.
    #[error("stock init should execute only in a git repository ({0}). Try running stock init after git init")]
    NotAGitRepo(PathBuf),
    /// A fresh store needs both a user name and an email.
    #[error("both name and email are required to initialize a new store")]
    MissingIdentity,
    /// `head.stock` exists without a store or git repository next to it.
    #[error("stock root at {0} should be the root of a git and hangar repository")]
    CorruptRoot(PathBuf),
    /// No stock root exists above the given path.
    #[error("not a stock repository (or any of the parent directories): {0}")]
    NotAStockRepo(PathBuf),
    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// An underlying IO operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for `init_repo`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Discard an existing store and start a fresh one.
    pub overwrite: bool,
}

/// What `init_repo` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub root: PathBuf,
    /// Commit the head pointer was initialized with (empty for a fresh store).
    pub head: String,
    /// An existing store was adopted instead of initialized.
    pub adopted: bool,
    pub created_head_file: bool,
    pub updated_gitignore: bool,
}

/// Establish a stock repository at `root`.
///
/// Steps run in order, and nothing is rolled back if a later step fails:
/// 1. require `root/.git`
/// 2. adopt the existing store, or initialize one with the given identity
/// 3. close the store environment
/// 4. create `head.stock` if absent
/// 5. add the store directory to `.gitignore`
pub fn init_repo<S: VersionStore>(
    root: &Path,
    options: &InitOptions,
) -> Result<InitReport, StockError> {
    let paths = StockPaths::new(root);
    if !paths.has_git() {
        return Err(StockError::NotAGitRepo(root.to_path_buf()));
    }

    let mut store = S::open_or_create(root)?;
    let adopted = !options.overwrite && store.is_initialized();

    let head = if adopted {
        let head = store.log()?.head.unwrap_or_default();
        log::info!(
            "Store already exists at {}. Initializing it as stock repository",
            store.path().display()
        );
        head
    } else {
        let identity = Identity::from_parts(options.name.as_deref(), options.email.as_deref())
            .ok_or(StockError::MissingIdentity)?;
        store.init(&identity, options.overwrite)?;
        String::new()
    };

    store.close_environment();

    let created_head_file = if paths.has_head_file() {
        false
    } else {
        set_current_head(root, &head)?;
        log::info!("Stock file created at {}", paths.head_file().display());
        true
    };

    let updated_gitignore = ensure_store_ignored(root)?;

    Ok(InitReport {
        root: root.to_path_buf(),
        head,
        adopted,
        created_head_file,
        updated_gitignore,
    })
}
