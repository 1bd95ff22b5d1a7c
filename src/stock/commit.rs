//! Committing from the commit the working tree is on.

use std::path::Path;

use super::StockError;
use super::head::{get_current_head, set_current_head};
use crate::store::VersionStore;

/// Commit to the store at `root` on top of the commit in `head.stock`, then
/// point `head.stock` at the new commit.
///
/// `head.stock` is git tracked, so after a `git checkout` it may name an older
/// commit than the store's own head; the new commit still sits on it. An
/// empty head file falls back to the store's head.
pub fn commit_head<S: VersionStore>(root: &Path, message: &str) -> Result<String, StockError> {
    let current = get_current_head(root)?;

    let mut store = S::open_or_create(root)?;
    let commit = if current.is_empty() {
        store.commit(message)
    } else {
        store.commit_on(Some(&current), message)
    };
    store.close_environment();
    let commit = commit?;

    set_current_head(root, &commit)?;
    log::info!("Moved head to {}", commit);
    Ok(commit)
}
