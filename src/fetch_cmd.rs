use std::path::PathBuf;

use crate::core::ProverConfig;
use crate::engine::ArtifactProvisioner;
use crate::engine::session::transport_from_config;
use crate::{AppResult, CommonMeta, WorkflowError, write_json_report};

/// Make sure the configured proving key is on disk and print where it is.
pub async fn run(config: &ProverConfig, json_out: Option<PathBuf>) -> AppResult<()> {
    let artifact = config.artifact.to_artifact();
    let provisioner = ArtifactProvisioner::new(transport_from_config(&config.artifact)?);

    let path = provisioner
        .ensure_present(&artifact)
        .await
        .map_err(WorkflowError::from)?;

    let meta = CommonMeta::collect("fetch", &artifact.name, &path).await;
    println!("artifact: {}", artifact.name);
    println!("path:     {}", path.display());
    if let Some(size) = meta.artifact_size_bytes {
        println!("size:     {size} bytes");
    }
    if let Some(sha) = &meta.artifact_sha256 {
        println!("sha256:   {sha}");
    }

    if let Some(json_path) = json_out {
        write_json_report(&json_path, &meta)?;
    }
    Ok(())
}
