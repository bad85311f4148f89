//! HTTP transport backed by `reqwest` and the local filesystem.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::traits::{FileStat, TransferOutcome, Transport, TransportError, TransportResult};

/// Downloads over HTTP(S) and manages files on local disk.
///
/// The body is streamed into a `<name>.part` sibling and renamed over the
/// destination once complete, so an interrupted transfer never leaves a
/// half-written file at the final path.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport without a request timeout.
    pub fn new() -> TransportResult<Self> {
        Self::with_timeout(None)
    }

    /// Create a transport whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpTransport { client })
    }
}

/// Sibling path the body is streamed into before the final rename.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_body(
    response: &mut reqwest::Response,
    file: &mut tokio::fs::File,
) -> TransportResult<u64> {
    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn stat(&self, path: &Path) -> TransportResult<FileStat> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(FileStat::present(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileStat::missing()),
            Err(e) => Err(e.into()),
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> TransportResult<TransferOutcome> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let part = partial_path(dest);
        let mut file = tokio::fs::File::create(&part).await?;
        let written = match write_body(&mut response, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };
        drop(file);
        tokio::fs::rename(&part, dest).await?;

        tracing::debug!(url, dest = %dest.display(), bytes = written, "download complete");
        Ok(TransferOutcome {
            status: status.as_u16(),
            bytes_written: written,
        })
    }

    async fn delete(&self, path: &Path) -> TransportResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_is_sibling() {
        assert_eq!(
            partial_path(Path::new("/keys/mul2.zkey")),
            PathBuf::from("/keys/mul2.zkey.part")
        );
    }

    #[tokio::test]
    async fn test_stat_missing_and_present() {
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new().unwrap();
        let path = dir.path().join("k.zkey");

        assert_eq!(transport.stat(&path).await.unwrap(), FileStat::missing());

        std::fs::write(&path, vec![0u8; 1000]).unwrap();
        assert_eq!(transport.stat(&path).await.unwrap(), FileStat::present(1000));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::new().unwrap();
        let path = dir.path().join("k.zkey");
        std::fs::write(&path, b"abc").unwrap();

        transport.delete(&path).await.unwrap();
        assert!(!path.exists());
        transport.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_download_unreachable_host_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = HttpTransport::with_timeout(Some(Duration::from_secs(5))).unwrap();
        // Port 9 on localhost is discard; nothing should be listening in CI.
        let err = transport
            .download("http://127.0.0.1:9/k.zkey", &dir.path().join("k.zkey"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
        assert!(!dir.path().join("k.zkey").exists());
    }
}
