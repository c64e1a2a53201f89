//! Cross-process lock guarding the credential store, built on flock(2).

use crate::constants;
use crate::util::fs as store_fs;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// A lock shared by every helper process that touches the same store.
pub trait RecordsLock {
    type Guard;

    /// Wait up to `timeout` for the lock. `Ok(None)` means it timed out.
    fn try_acquire(&self, timeout: Duration) -> Result<Option<Self::Guard>>;
}

/// An exclusive flock held on an open lock file. Closing the file on drop
/// releases it.
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// One non-blocking attempt. `Ok(None)` while another descriptor holds it.
    pub fn try_exclusive(path: &Path) -> Result<Option<Self>> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("open lock file {}", path.display()))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(err) if is_contended(&err) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("lock {}", path.display())),
        }
    }

    /// Poll for the lock until `timeout` elapses.
    pub fn try_exclusive_for(path: &Path, timeout: Duration) -> Result<Option<Self>> {
        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(constants::LOCK_POLL_INTERVAL_MS);
        loop {
            if let Some(lock) = Self::try_exclusive(path)? {
                return Ok(Some(lock));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(poll.min(deadline - now));
        }
    }

    /// Release now instead of waiting for drop.
    pub fn release(self) -> Result<()> {
        FileExt::unlock(&self.file).context("release lock")
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// The named lock for one store: `<store dir>/<namespace>.lock`.
#[derive(Debug, Clone)]
pub struct NamedFileLock {
    path: PathBuf,
}

impl NamedFileLock {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Lock file for the store at `store_file`, named from `namespace`.
    pub fn for_store(store_file: &Path, namespace: &str) -> Self {
        let dir = store_file.parent().unwrap_or_else(|| Path::new("."));
        let name = format!("{}{}", sanitize_lock_name(namespace), constants::LOCK_EXTENSION);
        Self::new(dir.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordsLock for NamedFileLock {
    type Guard = FileLock;

    fn try_acquire(&self, timeout: Duration) -> Result<Option<FileLock>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            store_fs::ensure_dir(parent, constants::STORE_DIR_MODE)?;
        }
        let lock = FileLock::try_exclusive_for(&self.path, timeout)?;
        debug!(lock = %self.path.display(), acquired = lock.is_some(), "store lock");
        Ok(lock)
    }
}

/// Replace characters that cannot appear in a lock name.
pub fn sanitize_lock_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_lock(dir: &TempDir) -> NamedFileLock {
        NamedFileLock::for_store(&dir.path().join("store.toml"), "app")
    }

    #[test]
    fn test_second_descriptor_is_refused_while_held() {
        let dir = TempDir::new().unwrap();
        let named = store_lock(&dir);
        let held = named.try_acquire(Duration::from_millis(50)).unwrap();
        assert!(held.is_some());
        assert!(named.path().exists());
        assert!(FileLock::try_exclusive(named.path()).unwrap().is_none());
    }

    #[test]
    fn test_drop_and_release_both_free_the_lock() {
        let dir = TempDir::new().unwrap();
        let named = store_lock(&dir);

        let dropped = named.try_acquire(Duration::from_millis(50)).unwrap();
        drop(dropped);
        let released = named.try_acquire(Duration::from_millis(50)).unwrap().unwrap();
        released.release().unwrap();
        assert!(named.try_acquire(Duration::from_millis(50)).unwrap().is_some());
    }

    #[test]
    fn test_try_acquire_times_out_when_held() {
        let dir = TempDir::new().unwrap();
        let named = store_lock(&dir);
        let _held = FileLock::try_exclusive_for(named.path(), Duration::from_millis(50))
            .unwrap()
            .unwrap();
        let started = Instant::now();
        let result = named.try_acquire(Duration::from_millis(120)).unwrap();
        assert!(result.is_none());
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_waiter_gets_lock_once_holder_releases() {
        let dir = TempDir::new().unwrap();
        let named = store_lock(&dir);
        let held = named.try_acquire(Duration::from_millis(50)).unwrap().unwrap();
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            held.release().unwrap();
        });
        assert!(named.try_acquire(Duration::from_secs(5)).unwrap().is_some());
        releaser.join().unwrap();
    }

    #[test]
    fn test_try_acquire_creates_store_directory() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("missing").join("store.toml");
        let named = NamedFileLock::for_store(&store, "app");
        assert!(named.try_acquire(Duration::from_millis(50)).unwrap().is_some());
        assert!(dir.path().join("missing").is_dir());
    }

    #[test]
    fn test_for_store_names_lock_from_namespace() {
        let named = NamedFileLock::for_store(Path::new("/tmp/x/creds.toml"), "git-credential-vault");
        assert_eq!(named.path(), Path::new("/tmp/x/git-credential-vault.lock"));
    }

    #[test]
    fn test_sanitize_lock_name() {
        assert_eq!(sanitize_lock_name(r"Global\app/name:1"), "Global_app_name_1");
        assert_eq!(sanitize_lock_name(""), "_");
    }
}
