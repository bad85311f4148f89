//! In-memory transport for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{FileStat, TransferOutcome, Transport, TransportError, TransportResult};

/// Configuration for mock transport responses.
#[derive(Debug, Clone)]
pub struct MockTransportConfig {
    /// Size of the file a successful download leaves behind
    pub served_size_bytes: u64,
    /// Error every download returns, if set
    pub download_error: Option<TransportError>,
    /// Simulated transfer latency
    pub download_delay: Option<Duration>,
}

impl MockTransportConfig {
    /// Downloads succeed and produce a file of `size` bytes.
    pub fn serving(size: u64) -> Self {
        MockTransportConfig {
            served_size_bytes: size,
            download_error: None,
            download_delay: None,
        }
    }

    /// Make every download fail with `error`.
    pub fn download_fails(mut self, error: TransportError) -> Self {
        self.download_error = Some(error);
        self
    }

    /// Sleep for `delay` inside every download.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }
}

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Stat(PathBuf),
    Download { url: String, dest: PathBuf },
    Delete(PathBuf),
}

/// Transport over an in-memory file table.
///
/// Files are represented only by their size, which is all the provisioner
/// inspects. Every call is recorded so tests can assert on side effects.
pub struct MockTransport {
    config: Mutex<MockTransportConfig>,
    files: Mutex<HashMap<PathBuf, u64>>,
    calls: Mutex<Vec<TransportCall>>,
}

impl MockTransport {
    pub fn new(config: MockTransportConfig) -> Self {
        MockTransport {
            config: Mutex::new(config),
            files: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Seed a file of `size` bytes at `path`.
    pub fn with_file(self, path: impl Into<PathBuf>, size: u64) -> Self {
        self.put_file(path, size);
        self
    }

    pub fn put_file(&self, path: impl Into<PathBuf>, size: u64) {
        lock(&self.files).insert(path.into(), size);
    }

    /// Simulate external eviction of a file.
    pub fn evict(&self, path: &Path) {
        lock(&self.files).remove(path);
    }

    /// Replace the response configuration, e.g. to fix a failing remote.
    pub fn reconfigure(&self, config: MockTransportConfig) {
        *lock(&self.config) = config;
    }

    pub fn file_size(&self, path: &Path) -> Option<u64> {
        lock(&self.files).get(path).copied()
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.calls).clone()
    }

    pub fn download_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Download { .. }))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Delete(_)))
    }

    fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(*c)).count()
    }

    fn record(&self, call: TransportCall) {
        lock(&self.calls).push(call);
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stat(&self, path: &Path) -> TransportResult<FileStat> {
        self.record(TransportCall::Stat(path.to_path_buf()));
        Ok(match self.file_size(path) {
            Some(size) => FileStat::present(size),
            None => FileStat::missing(),
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> TransportResult<TransferOutcome> {
        self.record(TransportCall::Download {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        let config = lock(&self.config).clone();
        if let Some(delay) = config.download_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = config.download_error {
            return Err(err);
        }
        self.put_file(dest, config.served_size_bytes);
        Ok(TransferOutcome {
            status: 200,
            bytes_written: config.served_size_bytes,
        })
    }

    async fn delete(&self, path: &Path) -> TransportResult<()> {
        self.record(TransportCall::Delete(path.to_path_buf()));
        self.evict(path);
        Ok(())
    }
}
