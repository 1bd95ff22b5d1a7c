//! Keeping the data store out of git.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::Path;

use super::StockPaths;
use super::paths::STORE_DIR;

/// Block appended to `.gitignore`.
pub const IGNORE_BLOCK: &str = "\n# hangar artifacts\n.hangar\n";

/// Make sure `.gitignore` at `root` excludes the store directory.
///
/// Creates the file if needed. The block is appended only when the store
/// directory name does not already appear anywhere in the file. Returns
/// whether anything was written.
pub fn ensure_store_ignored(root: &Path) -> io::Result<bool> {
    let path = StockPaths::new(root).gitignore();
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(&path)?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    if contents.contains(STORE_DIR) {
        return Ok(false);
    }

    file.write_all(IGNORE_BLOCK.as_bytes())?;
    log::info!("Added {} to {}", STORE_DIR, path.display());
    Ok(true)
}
