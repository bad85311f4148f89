//! Transport trait: remote blob transfer and the local file operations the
//! provisioner relies on.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a `stat` call. A missing path is not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub exists: bool,
    pub size_bytes: u64,
}

impl FileStat {
    pub fn missing() -> Self {
        FileStat::default()
    }

    pub fn present(size_bytes: u64) -> Self {
        FileStat {
            exists: true,
            size_bytes,
        }
    }
}

/// Summary of a completed download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// HTTP status of the response
    pub status: u16,
    /// Bytes written to the destination
    pub bytes_written: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Blob transfer plus the file operations used to validate and replace it.
///
/// Contract:
/// - `stat` never fails for a missing path; it reports `exists = false`.
/// - `download` fails on any non-success network outcome and writes the full
///   body to `dest` on success.
/// - `delete` is idempotent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the transport name (e.g., "http", "mock").
    fn name(&self) -> &str;

    async fn stat(&self, path: &Path) -> TransportResult<FileStat>;

    async fn download(&self, url: &str, dest: &Path) -> TransportResult<TransferOutcome>;

    async fn delete(&self, path: &Path) -> TransportResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stat_constructors() {
        assert!(!FileStat::missing().exists);
        assert_eq!(FileStat::missing().size_bytes, 0);
        assert_eq!(
            FileStat::present(7),
            FileStat {
                exists: true,
                size_bytes: 7
            }
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let err: TransportError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, TransportError::Io(ref m) if m.contains("denied")));
    }
}
