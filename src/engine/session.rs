//! Caller-facing session for the two-input multiplier circuit.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::{CommandEngine, CommandEngineConfig, ProofEngine};
use crate::core::{
    ArtifactConfig, CircuitInputs, EngineConfig, ProofResult, ProverConfig, ProvingArtifact,
};
use crate::transport::{HttpTransport, Transport};
use crate::{AppError, AppResult, WorkflowError, WorkflowResult};

use super::locks::ArtifactLocks;
use super::provisioner::ArtifactProvisioner;
use super::workflow::{Phase, ProofWorkflow, WorkflowState};

/// One logical proving session bound to a single artifact.
pub struct ProofSession {
    artifact: ProvingArtifact,
    workflow: ProofWorkflow,
}

impl ProofSession {
    pub fn new(
        artifact: ProvingArtifact,
        transport: Arc<dyn Transport>,
        engine: Arc<dyn ProofEngine>,
    ) -> Self {
        Self::from_workflow(
            artifact,
            ProofWorkflow::new(ArtifactProvisioner::new(transport), engine),
        )
    }

    /// Like `new`, but provisioning is serialized with other sessions sharing `locks`.
    pub fn with_shared_storage(
        artifact: ProvingArtifact,
        transport: Arc<dyn Transport>,
        engine: Arc<dyn ProofEngine>,
        locks: Arc<ArtifactLocks>,
    ) -> Self {
        let provisioner = ArtifactProvisioner::new(transport).with_locks(locks);
        Self::from_workflow(artifact, ProofWorkflow::new(provisioner, engine))
    }

    /// Build a session with the HTTP transport and the command engine described by `config`.
    pub fn from_config(config: &ProverConfig) -> AppResult<Self> {
        Ok(Self::new(
            config.artifact.to_artifact(),
            transport_from_config(&config.artifact)?,
            engine_from_config(&config.engine)?,
        ))
    }

    pub fn from_workflow(artifact: ProvingArtifact, workflow: ProofWorkflow) -> Self {
        ProofSession { artifact, workflow }
    }

    pub fn artifact(&self) -> &ProvingArtifact {
        &self.artifact
    }

    /// Prove knowledge of `a` and `b` for the multiplier circuit.
    ///
    /// Inputs that are not decimal integers are rejected before the pipeline
    /// starts and leave the phase untouched.
    pub async fn generate(&mut self, a: &str, b: &str) -> WorkflowResult<ProofResult> {
        let inputs = CircuitInputs::multiplier(a, b)
            .map_err(|e| WorkflowError::InvalidInput(e.to_string()))?;
        self.generate_with(&inputs).await
    }

    pub async fn generate_with(&mut self, inputs: &CircuitInputs) -> WorkflowResult<ProofResult> {
        self.workflow.generate(&self.artifact, inputs).await
    }

    /// Verify the proof produced by the last `generate`.
    pub async fn verify(&mut self) -> WorkflowResult<bool> {
        self.workflow.verify(&self.artifact, None).await
    }

    /// Verify a proof obtained elsewhere.
    pub async fn verify_proof(&mut self, proof: &ProofResult) -> WorkflowResult<bool> {
        self.workflow.verify(&self.artifact, Some(proof)).await
    }

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    pub fn phase(&self) -> Phase {
        self.workflow.phase()
    }

    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.workflow.last_error()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.workflow.subscribe()
    }
}

pub fn transport_from_config(config: &ArtifactConfig) -> AppResult<Arc<dyn Transport>> {
    let transport = HttpTransport::with_timeout(config.download_timeout())
        .map_err(|e| AppError::Message(e.to_string()))?;
    Ok(Arc::new(transport))
}

pub fn engine_from_config(config: &EngineConfig) -> AppResult<Arc<dyn ProofEngine>> {
    let prove = config.prove_template.clone().ok_or_else(|| {
        AppError::Message("no prove command configured (set engine.prove_template or --prove-cmd)".into())
    })?;
    let verify = config.verify_template.clone().ok_or_else(|| {
        AppError::Message("no verify command configured (set engine.verify_template or --verify-cmd)".into())
    })?;
    let engine = CommandEngine::new(CommandEngineConfig::new(prove, verify).with_timeout(config.timeout()));
    Ok(Arc::new(engine))
}

/// Log every phase change until the workflow is dropped.
pub fn spawn_phase_logger(mut rx: watch::Receiver<WorkflowState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            match &state.last_error {
                Some(err) => tracing::info!(phase = %state.phase, error = %err, "phase changed"),
                None => tracing::info!(phase = %state.phase, "phase changed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockEngine;
    use crate::transport::{MockTransport, MockTransportConfig};

    fn session() -> ProofSession {
        ProofSession::new(
            ProvingArtifact::new("mul2", "/keys/mul2.zkey", "https://example.org/mul2.zkey", 100),
            Arc::new(MockTransport::new(MockTransportConfig::serving(100))),
            Arc::new(MockEngine::default_mock()),
        )
    }

    #[tokio::test]
    async fn test_generate_then_verify() {
        let mut session = session();
        let proof = session.generate("3", "4").await.unwrap();
        assert_eq!(proof.inputs, vec!["12".to_string()]);
        assert!(session.verify().await.unwrap());
        assert_eq!(session.phase(), Phase::Verified);
    }

    #[test]
    fn test_engine_from_config_requires_templates() {
        let err = engine_from_config(&EngineConfig::default()).err().unwrap();
        assert!(err.to_string().contains("prove_template"));

        let config = EngineConfig {
            prove_template: Some("p {zkey} {inputs}".into()),
            verify_template: Some("v {zkey} {proof}".into()),
            timeout_secs: 5,
        };
        assert_eq!(engine_from_config(&config).unwrap().name(), "command");
    }

    #[tokio::test]
    async fn test_invalid_inputs_do_not_touch_phase() {
        let mut session = session();
        let err = session.generate("3", "abc").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.last_error().is_none());
    }
}
