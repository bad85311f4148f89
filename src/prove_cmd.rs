use std::path::PathBuf;
use std::time::Instant;

use crate::core::ProverConfig;
use crate::engine::ProofSession;
use crate::engine::session::spawn_phase_logger;
use crate::{AppError, AppResult, CommonMeta, ProveReport, write_json_report};

/// Generate a proof for `a * b`, optionally verifying it in the same session.
pub async fn run(
    config: &ProverConfig,
    a: String,
    b: String,
    out: Option<PathBuf>,
    json_out: Option<PathBuf>,
    verify: bool,
) -> AppResult<()> {
    let session = ProofSession::from_config(config)?;
    run_session(session, a, b, out, json_out, verify).await
}

/// Same as [`run`], against an already assembled session.
pub async fn run_session(
    mut session: ProofSession,
    a: String,
    b: String,
    out: Option<PathBuf>,
    json_out: Option<PathBuf>,
    verify: bool,
) -> AppResult<()> {
    let logger = spawn_phase_logger(session.subscribe());

    let start = Instant::now();
    let proof = session.generate(&a, &b).await?;
    let prove_ms = start.elapsed().as_millis();

    let rendered = serde_json::to_string_pretty(&proof)
        .map_err(|e| AppError::Message(format!("failed to serialize proof: {e}")))?;
    match &out {
        Some(path) => write_json_report(path, &proof)?,
        None => println!("{rendered}"),
    }
    println!("public inputs: {}", proof.inputs.join(", "));

    let (verify_ms, verified) = if verify {
        let start = Instant::now();
        let ok = session.verify().await?;
        let ms = start.elapsed().as_millis();
        println!("Verification {}", if ok { "Successful" } else { "Failed" });
        (Some(ms), Some(ok))
    } else {
        (None, None)
    };

    if let Some(json_path) = json_out {
        let artifact = session.artifact();
        let report = ProveReport {
            meta: CommonMeta::collect("prove", &artifact.name, &artifact.resolved_path()).await,
            provision_and_prove_time_ms: prove_ms,
            public_inputs: proof.inputs.clone(),
            verify_time_ms: verify_ms,
            verified,
        };
        write_json_report(&json_path, &report)?;
    }

    drop(session);
    let _ = logger.await;

    if verified == Some(false) {
        return Err(AppError::Message("verification failed: proof was rejected".into()));
    }
    Ok(())
}
