use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::{ProofResult, ProverConfig};
use crate::engine::ProofSession;
use crate::engine::session::spawn_phase_logger;
use crate::{AppError, AppResult, CommonMeta, VerifyReport, write_json_report};

/// Read a proof written by `prove --out`.
pub fn read_proof_file(path: &Path) -> AppResult<ProofResult> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Message(format!("failed to read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Message(format!("{} is not JSON: {e}", path.display())))?;
    ProofResult::from_engine_value(value).map_err(|detail| {
        AppError::Message(format!("{} is not a valid proof: {detail}", path.display()))
    })
}

/// Verify a stored proof against the configured proving key.
pub async fn run(config: &ProverConfig, proof_path: PathBuf, json_out: Option<PathBuf>) -> AppResult<()> {
    let session = ProofSession::from_config(config)?;
    run_session(session, proof_path, json_out).await
}

/// Same as [`run`], against an already assembled session.
pub async fn run_session(
    mut session: ProofSession,
    proof_path: PathBuf,
    json_out: Option<PathBuf>,
) -> AppResult<()> {
    let proof = read_proof_file(&proof_path)?;
    let logger = spawn_phase_logger(session.subscribe());

    let start = Instant::now();
    let ok = session.verify_proof(&proof).await?;
    let verify_time_ms = start.elapsed().as_millis();
    println!("Verification {}", if ok { "Successful" } else { "Failed" });

    if let Some(json_path) = json_out {
        let artifact = session.artifact();
        let report = VerifyReport {
            meta: CommonMeta::collect("verify", &artifact.name, &artifact.resolved_path()).await,
            verify_time_ms,
            ok,
        };
        write_json_report(&json_path, &report)?;
    }

    drop(session);
    let _ = logger.await;

    if !ok {
        return Err(AppError::Message("verification failed: proof was rejected".into()));
    }
    Ok(())
}
