//! Exclusive publication lock keyed by release label.
//!
//! On unix this is an advisory `flock` on `publish-<label>.lock`; the kernel
//! drops it when the process dies. Elsewhere the lock file is created
//! exclusively and removed on release.

use super::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Interval between acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Held publication lock; released on drop.
pub struct PublishLock {
    path: PathBuf,
    #[cfg(unix)]
    _guard: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

/// Lock file path for `label` inside `dir`.
pub fn lock_path(dir: &Path, label: &str) -> PathBuf {
    let safe: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    dir.join(format!("publish-{}.lock", safe))
}

impl PublishLock {
    /// Acquires the lock for `label`, waiting up to `wait`.
    pub async fn acquire(dir: &Path, label: &str, wait: Duration) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| Error::Lock {
            label: label.to_string(),
            reason: format!("cannot create {}: {}", dir.display(), e),
        })?;
        let path = lock_path(dir, label);
        let deadline = tokio::time::Instant::now() + wait;
        let mut announced = false;

        loop {
            match Self::try_acquire(&path) {
                Ok(Some(lock)) => {
                    log::info!("Acquired publication lock {}", path.display());
                    return Ok(lock);
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(Error::Lock {
                        label: label.to_string(),
                        reason: format!("{}: {}", path.display(), e),
                    });
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Lock {
                    label: label.to_string(),
                    reason: format!(
                        "held by another publication for more than {}s ({})",
                        wait.as_secs(),
                        path.display()
                    ),
                });
            }
            if !announced {
                log::info!("Waiting for another publication of '{}' to finish", label);
                announced = true;
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    /// One non-blocking attempt; `Ok(None)` when someone else holds it.
    #[cfg(unix)]
    fn try_acquire(path: &Path) -> std::io::Result<Option<Self>> {
        use nix::errno::Errno;
        use nix::fcntl::{Flock, FlockArg};

        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(guard) => Ok(Some(Self {
                path: path.to_path_buf(),
                _guard: guard,
            })),
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
            Err((_, errno)) => Err(std::io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn try_acquire(path: &Path) -> std::io::Result<Option<Self>> {
        match std::fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => Ok(Some(Self {
                path: path.to_path_buf(),
                _file: file,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(not(unix))]
impl Drop for PublishLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_names_are_filesystem_safe() {
        assert_eq!(
            lock_path(Path::new("/l"), "builds/latest"),
            PathBuf::from("/l/publish-builds_latest.lock")
        );
    }

    #[tokio::test]
    async fn second_holder_waits_then_times_out() {
        let dir = TempDir::new().unwrap();
        let first = PublishLock::acquire(dir.path(), "latest", Duration::ZERO).await.unwrap();

        let second = PublishLock::acquire(dir.path(), "latest", Duration::from_millis(100)).await;
        assert!(matches!(second, Err(Error::Lock { .. })));

        // Other labels are independent
        let other = PublishLock::acquire(dir.path(), "nightly", Duration::ZERO).await;
        assert!(other.is_ok());

        drop(first);
        assert!(PublishLock::acquire(dir.path(), "latest", Duration::ZERO).await.is_ok());
    }
}
