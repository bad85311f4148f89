//! Per-path mutual exclusion for provisioning shared artifact storage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of async locks keyed by artifact path.
///
/// Two sessions racing a delete + redownload of the same file would corrupt
/// each other; holding the lock for the duration of `ensure_present` makes
/// the second caller observe the first caller's finished download.
#[derive(Debug, Default)]
pub struct ArtifactLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl ArtifactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(path.to_path_buf()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of distinct paths seen so far.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let locks = Arc::new(ArtifactLocks::new());
        let guard = locks.acquire(Path::new("/keys/a.zkey")).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(Path::new("/keys/a.zkey")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_paths_do_not_block() {
        let locks = ArtifactLocks::new();
        let _a = locks.acquire(Path::new("/keys/a.zkey")).await;
        let _b = locks.acquire(Path::new("/keys/b.zkey")).await;
        assert_eq!(locks.len(), 2);
    }
}
