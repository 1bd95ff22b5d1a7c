//! Reading and writing the head pointer file.
//!
//! The head file stores exactly one commit reference (or nothing). Writes
//! replace the whole file. There is no locking: concurrent writers race and
//! the last one to close the file wins.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::Path;

use super::StockPaths;

/// Read the commit reference stored at `root`.
///
/// Returns an empty string when the file is empty. A missing file is an
/// error: callers pass a root found by `find_stock_root`, which guarantees it.
pub fn get_current_head(root: &Path) -> io::Result<String> {
    let mut file = OpenOptions::new()
        .read(true)
        .open(StockPaths::new(root).head_file())?;
    let mut commit = String::new();
    file.read_to_string(&mut commit)?;
    Ok(commit)
}

/// Replace the commit reference stored at `root`.
pub fn set_current_head(root: &Path, commit: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(StockPaths::new(root).head_file())?;
    file.write_all(commit.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        for commit in ["", "a1b2c3d4", "0123456789abcdef0123456789abcdef01234567"] {
            set_current_head(dir.path(), commit).unwrap();
            assert_eq!(get_current_head(dir.path()).unwrap(), commit);
        }
    }

    #[test]
    fn test_round_trip_preserves_arbitrary_text() {
        let dir = TempDir::new().unwrap();
        let commit = "  spaced\nmulti-line ☃ ";
        set_current_head(dir.path(), commit).unwrap();
        assert_eq!(get_current_head(dir.path()).unwrap(), commit);
    }

    #[test]
    fn test_write_replaces_longer_value() {
        let dir = TempDir::new().unwrap();
        set_current_head(dir.path(), "a-very-long-commit-reference").unwrap();
        set_current_head(dir.path(), "short").unwrap();
        assert_eq!(get_current_head(dir.path()).unwrap(), "short");

        let raw = std::fs::read_to_string(dir.path().join("head.stock")).unwrap();
        assert_eq!(raw, "short");
    }

    #[test]
    fn test_empty_file_reads_as_empty_string() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("head.stock"), "").unwrap();
        assert_eq!(get_current_head(dir.path()).unwrap(), "");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = get_current_head(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
