//! Data versioning store

mod backend;
mod hangar;
mod lock;

pub use backend::{CommitSpec, LogContents, StoreError, VersionStore};
pub use hangar::HangarStore;
