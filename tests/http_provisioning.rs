//! Provisioning over real HTTP against a throwaway local server.
//!
//! The server speaks just enough HTTP/1.1 to answer one GET per connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use zkey_prover::ProvisionError;
use zkey_prover::core::ProvingArtifact;
use zkey_prover::engine::ArtifactProvisioner;
use zkey_prover::transport::{HttpTransport, Transport, TransportError, http::partial_path};

/// Serve `status` with `body` to every connection; returns the base URL and a hit counter.
async fn spawn_server(status: &'static str, body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), hits)
}

fn create_test_provisioner() -> ArtifactProvisioner {
    ArtifactProvisioner::new(Arc::new(HttpTransport::new().unwrap()))
}

#[tokio::test]
async fn test_downloads_missing_artifact_to_disk() {
    let (base, hits) = spawn_server("200 OK", vec![7u8; 4096]).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nested").join("multiplier2_final.zkey");
    let artifact = ProvingArtifact::new(
        "multiplier2_final.zkey",
        format!("file://{}", dest.display()),
        format!("{base}/multiplier2_final.zkey"),
        4096,
    );

    let path = create_test_provisioner().ensure_present(&artifact).await.unwrap();
    assert_eq!(path, dest, "file:// prefix is stripped");
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 4096);
    assert!(!partial_path(&dest).exists(), "partial file is renamed away");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    create_test_provisioner().ensure_present(&artifact).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1, "a valid file is not fetched again");
}

#[tokio::test]
async fn test_truncated_artifact_is_replaced() {
    let (base, _) = spawn_server("200 OK", vec![1u8; 2048]).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("key.zkey");
    std::fs::write(&dest, b"partial").unwrap();

    let artifact = ProvingArtifact::new("key", dest.to_string_lossy(), format!("{base}/key"), 2000);
    create_test_provisioner().ensure_present(&artifact).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), vec![1u8; 2048]);
}

#[tokio::test]
async fn test_http_error_status_is_transfer_failure() {
    let (base, _) = spawn_server("404 Not Found", b"not here".to_vec()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("key.zkey");
    let artifact = ProvingArtifact::new("key", dest.to_string_lossy(), format!("{base}/key"), 10);

    let err = create_test_provisioner().ensure_present(&artifact).await.unwrap_err();
    assert_eq!(
        err,
        ProvisionError::TransferFailed("server responded with HTTP 404".into())
    );
    assert!(!dest.exists(), "nothing is written for an error response");
}

#[tokio::test]
async fn test_short_body_fails_integrity_check() {
    let (base, _) = spawn_server("200 OK", vec![0u8; 100]).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("key.zkey");
    let artifact = ProvingArtifact::new("key", dest.to_string_lossy(), format!("{base}/key"), 6_000_000);

    let err = create_test_provisioner().ensure_present(&artifact).await.unwrap_err();
    assert_eq!(
        err,
        ProvisionError::IntegrityCheckFailed {
            path: dest.clone(),
            size_bytes: 100,
            minimum_bytes: 6_000_000,
        }
    );
}

#[tokio::test]
async fn test_transport_reports_status_directly() {
    let (base, _) = spawn_server("503 Service Unavailable", Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let transport = HttpTransport::new().unwrap();

    let err = transport
        .download(&format!("{base}/key"), &dir.path().join("key"))
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::Status(503));
}

#[tokio::test]
async fn test_fetch_command_writes_report() {
    let body = vec![3u8; 1500];
    let expected_sha = zkey_prover::sha256_hex(&body);
    let (base, _) = spawn_server("200 OK", body).await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = zkey_prover::core::ProverConfig::default();
    config.artifact.name = "key.zkey".into();
    config.artifact.local_path = Some(dir.path().join("key.zkey").to_string_lossy().into_owned());
    config.artifact.remote_url = format!("{base}/key.zkey");
    config.artifact.min_size_bytes = 1000;

    let report = dir.path().join("fetch.json");
    zkey_prover::fetch_cmd::run(&config, Some(report.clone())).await.unwrap();

    let report: serde_json::Value = serde_json::from_slice(&std::fs::read(&report).unwrap()).unwrap();
    assert_eq!(report["name"], "fetch");
    assert_eq!(report["artifact_size_bytes"], 1500);
    assert_eq!(report["artifact_sha256"], expected_sha.as_str());
}
