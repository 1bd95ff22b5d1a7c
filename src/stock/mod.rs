//! Stock root resolution and the head pointer protocol

mod commit;
mod head;
mod ignore;
mod keeper;
mod paths;
mod root;

pub use commit::commit_head;
pub use head::{get_current_head, set_current_head};
pub use ignore::{IGNORE_BLOCK, ensure_store_ignored};
pub use keeper::{InitOptions, InitReport, StockError, init_repo};
pub use paths::{GIT_DIR, GITIGNORE, HEAD_FILE, STORE_DIR, StockPaths};
pub use root::{find_stock_root, require_stock_root};
