pub mod backend;
pub mod core;
pub mod engine;
pub mod transport;

pub mod fetch_cmd;
pub mod prove_cmd;
pub mod verify_cmd;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Failures while making a proving artifact available on local storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("transfer failed: {0}")]
    TransferFailed(String),
    #[error(
        "integrity check failed: {} is {size_bytes} bytes after download, expected at least {minimum_bytes}",
        .path.display()
    )]
    IntegrityCheckFailed {
        path: PathBuf,
        size_bytes: u64,
        minimum_bytes: u64,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors surfaced by the proof workflow to its caller.
///
/// Every variant renders with a category prefix so a caller can tell
/// provisioning problems apart from engine problems without matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("provisioning error: {0}")]
    Provisioning(#[from] ProvisionError),
    #[error("engine contract violation: {0}")]
    EngineContract(String),
    #[error("usage error: no proof available to verify")]
    NoProofAvailable,
    #[error("engine error: {0}")]
    EngineFailure(String),
    #[error("input error: {0}")]
    InvalidInput(String),
}

impl WorkflowError {
    /// Short category label, stable across releases.
    pub fn category(&self) -> &'static str {
        match self {
            WorkflowError::Provisioning(_) => "provisioning",
            WorkflowError::EngineContract(_) => "engine-contract",
            WorkflowError::NoProofAvailable => "usage",
            WorkflowError::EngineFailure(_) => "engine",
            WorkflowError::InvalidInput(_) => "input",
        }
    }

    /// Whether calling `generate`/`verify` again without code or input changes may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Provisioning(_) | WorkflowError::EngineFailure(_)
        )
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Top-level error for the command-line front end.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonMeta {
    pub name: String,
    pub timestamp: String,
    pub artifact_name: String,
    pub artifact_path: PathBuf,
    pub artifact_size_bytes: Option<u64>,
    pub artifact_sha256: Option<String>,
    pub cli_args: Vec<String>,
}

impl CommonMeta {
    /// Collect metadata for a run against the artifact at `artifact_path`.
    pub async fn collect(name: &str, artifact_name: &str, artifact_path: &std::path::Path) -> Self {
        let bytes = tokio::fs::read(artifact_path).await.ok();
        CommonMeta {
            name: name.to_string(),
            timestamp: now_rfc3339(),
            artifact_name: artifact_name.to_string(),
            artifact_path: artifact_path.to_path_buf(),
            artifact_size_bytes: bytes.as_ref().map(|b| b.len() as u64),
            artifact_sha256: bytes.as_ref().map(|b| sha256_hex(b)),
            cli_args: std::env::args().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProveReport {
    #[serde(flatten)]
    pub meta: CommonMeta,
    pub provision_and_prove_time_ms: u128,
    pub public_inputs: Vec<String>,
    pub verify_time_ms: Option<u128>,
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    #[serde(flatten)]
    pub meta: CommonMeta,
    pub verify_time_ms: u128,
    pub ok: bool,
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Write a pretty-printed JSON report, creating parent directories as needed.
pub fn write_json_report<T: Serialize>(path: &std::path::Path, report: &T) -> anyhow::Result<()> {
    use anyhow::Context;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let bytes = serde_json::to_vec_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_messages_carry_category_prefix() {
        let provisioning = WorkflowError::from(ProvisionError::TransferFailed("HTTP 404".into()));
        assert_eq!(
            provisioning.to_string(),
            "provisioning error: transfer failed: HTTP 404"
        );
        assert_eq!(
            WorkflowError::EngineFailure("witness mismatch".into()).to_string(),
            "engine error: witness mismatch"
        );
        assert!(
            WorkflowError::EngineContract("bad".into())
                .to_string()
                .starts_with("engine contract violation:")
        );
        assert!(WorkflowError::NoProofAvailable.to_string().starts_with("usage error:"));
    }

    #[test]
    fn test_workflow_error_classification() {
        assert!(WorkflowError::EngineFailure("x".into()).is_retryable());
        assert!(WorkflowError::Provisioning(ProvisionError::Storage("x".into())).is_retryable());
        assert!(!WorkflowError::EngineContract("x".into()).is_retryable());
        assert!(!WorkflowError::NoProofAvailable.is_retryable());
        assert_eq!(WorkflowError::NoProofAvailable.category(), "usage");
        assert_eq!(
            WorkflowError::Provisioning(ProvisionError::Storage("x".into())).category(),
            "provisioning"
        );
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
