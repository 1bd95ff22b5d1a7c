//! Locating the stock root from anywhere inside a repository.

use std::path::{Path, PathBuf};

use super::{StockError, StockPaths};

/// Walk from `path` up to the filesystem root looking for `head.stock`.
///
/// The first directory holding the head file is the stock root. It must also
/// hold a store directory or a git marker, otherwise the layout is corrupt.
/// Returns `Ok(None)` when no ancestor holds a head file.
pub fn find_stock_root(path: &Path) -> Result<Option<PathBuf>, StockError> {
    let mut current = std::path::absolute(path)?;

    loop {
        let paths = StockPaths::new(&current);
        if paths.has_head_file() {
            if !paths.has_store() && !paths.has_git() {
                return Err(StockError::CorruptRoot(current));
            }
            log::debug!("Found stock root at {}", current.display());
            return Ok(Some(current));
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => {
                log::debug!("No stock root above {}", path.display());
                return Ok(None);
            }
        }
    }
}

/// Like `find_stock_root`, but a missing root is an error.
pub fn require_stock_root(path: &Path) -> Result<PathBuf, StockError> {
    find_stock_root(path)?.ok_or_else(|| StockError::NotAStockRepo(path.to_path_buf()))
}
