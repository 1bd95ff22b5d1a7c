//! SQLite-backed store kept in the `.hangar` directory.
//!
//! The store is a linear commit log with a head pointer. While a handle has
//! the environment open it holds an exclusive flock on `.hangar/env.lock`, so
//! a second process opening the same store waits and then fails with
//! `StoreError::Locked`.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::lock::{DEFAULT_LOCK_TIMEOUT, EnvLock};
use super::{CommitSpec, LogContents, StoreError, VersionStore};
use crate::stock::StockPaths;
use crate::types::Identity;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS commits (
        id INTEGER PRIMARY KEY,
        digest TEXT NOT NULL UNIQUE,
        parent TEXT,
        message TEXT NOT NULL,
        user_name TEXT NOT NULL,
        user_email TEXT NOT NULL,
        commit_time INTEGER NOT NULL
    );
";

/// Length of a commit reference in hex digits.
const COMMIT_REF_LEN: usize = 40;

/// Returns the current Unix timestamp in seconds.
fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// An open store environment. Field order matters: the connection is closed
/// before the lock is released.
struct Env {
    conn: Connection,
    lock: EnvLock,
}

fn acquire_lock(paths: &StockPaths, timeout: Duration) -> Result<EnvLock, StoreError> {
    match EnvLock::acquire_with_timeout(&paths.store_lock(), timeout) {
        Ok(lock) => Ok(lock),
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            Err(StoreError::Locked(paths.store_dir()))
        }
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Remove everything in the store directory except the lock file.
fn clear_store_dir(paths: &StockPaths) -> std::io::Result<()> {
    let lock_path = paths.store_lock();
    for entry in std::fs::read_dir(paths.store_dir())? {
        let path = entry?.path();
        if path == lock_path {
            continue;
        }
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

impl Env {
    fn open(paths: &StockPaths, timeout: Duration) -> Result<Self, StoreError> {
        let lock = acquire_lock(paths, timeout)?;
        Self::with_lock(paths, lock)
    }

    fn with_lock(paths: &StockPaths, lock: EnvLock) -> Result<Self, StoreError> {
        let conn = Connection::open(paths.store_db())?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, lock })
    }

    /// Close the connection but keep holding the environment lock.
    fn into_lock(self) -> EnvLock {
        let Env { conn, lock } = self;
        drop(conn);
        lock
    }

    fn meta(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
    }

    fn has_commit(&self, digest: &str) -> Result<bool, rusqlite::Error> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM commits WHERE digest = ?1)",
            params![digest],
            |row| row.get(0),
        )
    }
}

/// The default `VersionStore`.
pub struct HangarStore {
    paths: StockPaths,
    lock_timeout: Duration,
    env: Option<Env>,
}

impl HangarStore {
    /// Open the store at `path`, waiting at most `lock_timeout` for another
    /// handle to release the environment.
    pub fn open_with_timeout(path: &Path, lock_timeout: Duration) -> Result<Self, StoreError> {
        let paths = StockPaths::new(path);
        let env = if paths.store_db().exists() {
            Some(Env::open(&paths, lock_timeout)?)
        } else {
            None
        };

        Ok(Self {
            paths,
            lock_timeout,
            env,
        })
    }

    fn env(&self) -> Result<&Env, StoreError> {
        self.env.as_ref().ok_or_else(|| missing_env(&self.paths))
    }
}

fn missing_env(paths: &StockPaths) -> StoreError {
    if paths.store_db().exists() {
        StoreError::Closed(paths.store_dir())
    } else {
        StoreError::NotInitialized(paths.root().to_path_buf())
    }
}

fn commit_digest(
    parent: Option<&str>,
    message: &str,
    name: &str,
    email: &str,
    time: i64,
    seq: i64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent.unwrap_or("").as_bytes());
    hasher.update([0u8]);
    hasher.update(message.as_bytes());
    hasher.update([0u8]);
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(email.as_bytes());
    hasher.update([0u8]);
    hasher.update(time.to_be_bytes());
    hasher.update(seq.to_be_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(COMMIT_REF_LEN);
    digest
}

impl VersionStore for HangarStore {
    fn open_or_create(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    fn path(&self) -> &Path {
        self.paths.root()
    }

    fn is_initialized(&self) -> bool {
        self.env.is_some() || self.paths.store_db().exists()
    }

    fn init(&mut self, identity: &Identity, remove_old: bool) -> Result<(), StoreError> {
        if self.is_initialized() && !remove_old {
            return Err(StoreError::AlreadyInitialized(self.paths.root().to_path_buf()));
        }

        // The lock stays held from here on, so no other handle can open the
        // store while old contents are removed.
        let lock = match self.env.take() {
            Some(env) => env.into_lock(),
            None => {
                std::fs::create_dir_all(self.paths.store_dir())?;
                acquire_lock(&self.paths, self.lock_timeout)?
            }
        };

        if remove_old {
            log::info!("Removing existing store at {}", self.paths.store_dir().display());
            clear_store_dir(&self.paths)?;
        }

        let mut env = Env::with_lock(&self.paths, lock)?;
        let tx = env.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('user_name', ?1)",
            params![identity.name()],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('user_email', ?1)",
            params![identity.email()],
        )?;
        tx.commit()?;

        log::info!(
            "Initialized store at {} for {}",
            self.paths.store_dir().display(),
            identity
        );
        self.env = Some(env);
        Ok(())
    }

    fn log(&self) -> Result<LogContents, StoreError> {
        let env = self.env()?;
        let head = env.meta("head")?;

        let mut contents = LogContents {
            head: head.clone(),
            ..LogContents::default()
        };

        let mut next = head;
        while let Some(digest) = next {
            let spec = env.conn.query_row(
                "SELECT parent, message, user_name, user_email, commit_time
                 FROM commits WHERE digest = ?1",
                params![digest],
                |row| {
                    Ok(CommitSpec {
                        parent: row.get(0)?,
                        message: row.get(1)?,
                        user_name: row.get(2)?,
                        user_email: row.get(3)?,
                        commit_time: row.get(4)?,
                    })
                },
            )?;
            next = spec.parent.clone();
            contents.order.push(digest.clone());
            contents.specs.insert(digest, spec);
        }

        Ok(contents)
    }

    fn commit(&mut self, message: &str) -> Result<String, StoreError> {
        let parent = self.env()?.meta("head")?;
        self.commit_on(parent.as_deref(), message)
    }

    fn commit_on(&mut self, parent: Option<&str>, message: &str) -> Result<String, StoreError> {
        let Some(env) = self.env.as_mut() else {
            return Err(missing_env(&self.paths));
        };

        if let Some(parent) = parent {
            if !env.has_commit(parent)? {
                return Err(StoreError::UnknownCommit(parent.to_string()));
            }
        }

        let name = env.meta("user_name")?.unwrap_or_default();
        let email = env.meta("user_email")?.unwrap_or_default();
        let seq: i64 = env
            .conn
            .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?;
        let time = now_unix();
        let digest = commit_digest(parent, message, &name, &email, time, seq + 1);

        let tx = env.conn.transaction()?;
        tx.execute(
            "INSERT INTO commits (digest, parent, message, user_name, user_email, commit_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![digest, parent, message, name, email, time],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('head', ?1)",
            params![digest],
        )?;
        tx.commit()?;

        log::debug!("Committed {} on top of {:?}", digest, parent);
        Ok(digest)
    }

    fn close_environment(&mut self) {
        if self.env.take().is_some() {
            log::debug!("Closed store environment at {}", self.paths.store_dir().display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity() -> Identity {
        Identity::new("Ada", "ada@example.com").unwrap()
    }

    fn initialized_store(dir: &TempDir) -> HangarStore {
        let mut store = HangarStore::open_or_create(dir.path()).unwrap();
        store.init(&identity(), false).unwrap();
        store
    }

    #[test]
    fn test_open_without_store_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let store = HangarStore::open_or_create(dir.path()).unwrap();
        assert!(!store.is_initialized());
        assert_eq!(store.path(), dir.path());
        assert!(!dir.path().join(".hangar").exists());
    }

    #[test]
    fn test_init_creates_store() {
        let dir = TempDir::new().unwrap();
        let store = initialized_store(&dir);
        assert!(store.is_initialized());
        assert!(dir.path().join(".hangar").join("store.db").exists());
        assert_eq!(store.log().unwrap(), LogContents::default());
    }

    #[test]
    fn test_init_twice_without_remove_old_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        assert!(matches!(
            store.init(&identity(), false),
            Err(StoreError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_commit_moves_head() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);

        let first = store.commit("first").unwrap();
        let second = store.commit("second").unwrap();
        assert_eq!(first.len(), COMMIT_REF_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);

        let log = store.log().unwrap();
        assert_eq!(log.head.as_deref(), Some(second.as_str()));
        assert_eq!(log.order, vec![second.clone(), first.clone()]);
        assert_eq!(log.specs[&second].parent.as_deref(), Some(first.as_str()));
        assert_eq!(log.specs[&first].parent, None);
        assert_eq!(log.specs[&first].message, "first");
        assert_eq!(log.specs[&first].user_name, "Ada");
        assert_eq!(log.specs[&first].user_email, "ada@example.com");
    }

    #[test]
    fn test_history_persists_across_handles() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        let head = store.commit("persisted").unwrap();
        store.close_environment();

        let reopened = HangarStore::open_or_create(dir.path()).unwrap();
        assert!(reopened.is_initialized());
        assert_eq!(reopened.log().unwrap().head, Some(head));
    }

    #[test]
    fn test_remove_old_discards_history() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        store.commit("doomed").unwrap();

        store.init(&identity(), true).unwrap();
        assert_eq!(store.log().unwrap().head, None);
    }

    #[test]
    fn test_uninitialized_operations_fail() {
        let dir = TempDir::new().unwrap();
        let mut store = HangarStore::open_or_create(dir.path()).unwrap();
        assert!(matches!(store.log(), Err(StoreError::NotInitialized(_))));
        assert!(matches!(
            store.commit("nope"),
            Err(StoreError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_open_environment_blocks_second_handle() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);

        let second = HangarStore::open_with_timeout(dir.path(), Duration::from_millis(50));
        assert!(matches!(second, Err(StoreError::Locked(_))));

        store.close_environment();
        let third = HangarStore::open_with_timeout(dir.path(), Duration::from_millis(50)).unwrap();
        assert!(third.is_initialized());
    }

    #[test]
    fn test_close_environment_twice() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        store.close_environment();
        store.close_environment();
        assert!(store.is_initialized());
        assert!(matches!(store.log(), Err(StoreError::Closed(_))));
    }

    #[test]
    fn test_commit_on_earlier_parent() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        let first = store.commit("one").unwrap();
        store.commit("two").unwrap();

        let third = store.commit_on(Some(&first), "three").unwrap();

        let log = store.log().unwrap();
        assert_eq!(log.head.as_deref(), Some(third.as_str()));
        assert_eq!(log.order, vec![third.clone(), first.clone()]);
        assert_eq!(log.specs[&third].parent.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_commit_on_none_is_root_commit() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        store.commit("one").unwrap();

        let root = store.commit_on(None, "fresh start").unwrap();
        assert_eq!(store.log().unwrap().order, vec![root]);
    }

    #[test]
    fn test_commit_on_unknown_parent_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        let head = store.commit("one").unwrap();

        assert!(matches!(
            store.commit_on(Some("deadbeef"), "orphan"),
            Err(StoreError::UnknownCommit(c)) if c == "deadbeef"
        ));
        assert_eq!(store.log().unwrap().head, Some(head));
    }

    #[test]
    fn test_remove_old_keeps_lock_held() {
        use std::os::unix::fs::MetadataExt;

        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        store.commit("doomed").unwrap();
        let lock_path = dir.path().join(".hangar").join("env.lock");
        let inode = std::fs::metadata(&lock_path).unwrap().ino();

        store.init(&identity(), true).unwrap();

        assert_eq!(std::fs::metadata(&lock_path).unwrap().ino(), inode);
        let second = HangarStore::open_with_timeout(dir.path(), Duration::from_millis(50));
        assert!(matches!(second, Err(StoreError::Locked(_))));
        assert_eq!(store.log().unwrap().head, None);
    }

    #[test]
    fn test_remove_old_on_closed_handle() {
        let dir = TempDir::new().unwrap();
        let mut store = initialized_store(&dir);
        store.commit("doomed").unwrap();
        store.close_environment();

        store.init(&identity(), true).unwrap();
        assert_eq!(store.log().unwrap().head, None);
    }

    #[test]
    fn test_commit_digest_depends_on_parent() {
        let a = commit_digest(None, "msg", "n", "e", 1, 1);
        let b = commit_digest(Some("abc"), "msg", "n", "e", 1, 1);
        assert_ne!(a, b);
        assert_eq!(a, commit_digest(None, "msg", "n", "e", 1, 1));
    }
}
