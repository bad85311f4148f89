//! Engine that delegates to an external prover binary through command templates.

use std::io::Write;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shlex::Shlex;
use tokio::process::Command;

use crate::core::ProofResult;

use super::traits::{EngineError, EngineResult, ProofEngine};

/// Configuration for the command engine.
#[derive(Debug, Clone)]
pub struct CommandEngineConfig {
    /// Prove command (placeholders: {zkey}, {inputs}); prints the proof JSON on stdout
    pub prove_template: String,
    /// Verify command (placeholders: {zkey}, {proof}); prints `true` or `false`
    pub verify_template: String,
    /// Upper bound for a single prover invocation
    pub timeout: Option<Duration>,
}

impl CommandEngineConfig {
    pub fn new(prove_template: impl Into<String>, verify_template: impl Into<String>) -> Self {
        CommandEngineConfig {
            prove_template: prove_template.into(),
            verify_template: verify_template.into(),
            timeout: None,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Proof engine backed by external commands.
pub struct CommandEngine {
    config: CommandEngineConfig,
}

impl CommandEngine {
    pub fn new(config: CommandEngineConfig) -> Self {
        CommandEngine { config }
    }

    async fn run(&self, mut cmd: Command) -> EngineResult<Output> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| {
                    EngineError::Failed(format!("prover timed out after {}s", timeout.as_secs()))
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| EngineError::Failed(format!("failed to spawn prover: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("prover exited with {}", output.status)
            } else {
                stderr
            };
            return Err(EngineError::Failed(message));
        }
        Ok(output)
    }
}

/// Split a shell-style template and substitute `{placeholder}` values.
///
/// Substitution happens after splitting, so a value containing spaces (such
/// as an inputs JSON document) stays a single argument.
pub fn build_command(template: &str, replacements: &[(&str, &str)]) -> EngineResult<Command> {
    let mut parts: Vec<String> = Shlex::new(template).collect();
    if parts.is_empty() {
        return Err(EngineError::Failed("empty command template".into()));
    }
    for p in &mut parts {
        for (key, value) in replacements {
            *p = p.replace(&format!("{{{key}}}"), value);
        }
    }
    let mut cmd = Command::new(&parts[0]);
    cmd.args(&parts[1..]);
    Ok(cmd)
}

#[async_trait]
impl ProofEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    async fn compute_proof(&self, artifact: &Path, inputs_json: &str) -> EngineResult<Value> {
        let zkey = artifact.to_string_lossy().into_owned();
        let cmd = build_command(
            &self.config.prove_template,
            &[("zkey", zkey.as_str()), ("inputs", inputs_json)],
        )?;
        let output = self.run(cmd).await?;
        serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::Malformed(format!("prover stdout is not JSON: {e}")))
    }

    async fn check_proof(&self, artifact: &Path, proof: &ProofResult) -> EngineResult<bool> {
        let payload = serde_json::to_vec(proof)
            .map_err(|e| EngineError::Failed(format!("failed to encode proof: {e}")))?;
        let mut proof_file = tempfile::Builder::new()
            .prefix("proof-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| EngineError::Failed(format!("failed to create proof file: {e}")))?;
        proof_file
            .write_all(&payload)
            .and_then(|_| proof_file.flush())
            .map_err(|e| EngineError::Failed(format!("failed to write proof file: {e}")))?;

        let zkey = artifact.to_string_lossy().into_owned();
        let proof_path = proof_file.path().to_string_lossy().into_owned();
        let cmd = build_command(
            &self.config.verify_template,
            &[("zkey", zkey.as_str()), ("proof", proof_path.as_str())],
        )?;
        let output = self.run(cmd).await?;

        match String::from_utf8_lossy(&output.stdout).trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(EngineError::Malformed(format!(
                "expected `true` or `false` from verifier, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_keeps_json_as_one_argument() {
        let cmd = build_command(
            "prover prove --zkey {zkey} --inputs {inputs}",
            &[("zkey", "/k.zkey"), ("inputs", r#"{"a": ["3"], "b": ["4"]}"#)],
        )
        .unwrap();
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "prover");
        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["prove", "--zkey", "/k.zkey", "--inputs", r#"{"a": ["3"], "b": ["4"]}"#]
        );
    }

    #[test]
    fn test_build_command_rejects_empty_template() {
        assert!(build_command("   ", &[]).is_err());
    }
}
