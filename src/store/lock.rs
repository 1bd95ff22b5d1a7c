use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

/// Default lock timeout for opening a store environment.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// A guard that holds the exclusive environment lock of a store.
/// Lock is released when dropped.
#[derive(Debug)]
pub struct EnvLock {
    file: File,
}

impl EnvLock {
    /// Acquire the environment lock, polling until available or `timeout`.
    /// Creates the lock file (not its parent directory) if needed.
    ///
    /// Returns an error with `ErrorKind::TimedOut` if the lock cannot be
    /// acquired within the specified duration.
    pub fn acquire_with_timeout(lock_path: &Path, timeout: Duration) -> io::Result<Self> {
        let file = open_lock_file(lock_path)?;

        let start = Instant::now();
        let mut sleep_duration = Duration::from_millis(10);
        let max_sleep = Duration::from_millis(500);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if start.elapsed() >= timeout {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("store lock timed out after {:?}", timeout),
                        ));
                    }
                    log::debug!("Waiting for store lock {}", lock_path.display());
                    std::thread::sleep(sleep_duration);
                    sleep_duration = (sleep_duration * 2).min(max_sleep);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Try to acquire the lock without blocking.
    /// Returns None if the lock is held elsewhere.
    #[cfg(test)]
    pub fn try_acquire(lock_path: &Path) -> io::Result<Option<Self>> {
        let file = open_lock_file(lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn open_lock_file(lock_path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
}

impl Drop for EnvLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
