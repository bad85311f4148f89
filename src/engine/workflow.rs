//! Proof lifecycle orchestration.
//!
//! `ProofWorkflow` composes the `ArtifactProvisioner` and a `ProofEngine` and
//! owns the `WorkflowState` that says what the caller may legally do next.
//!
//! # State machine
//!
//! ```text
//! Idle | Ready | Verified | Failed --generate--> Provisioning -> Generating -> Ready | Failed
//! Ready | Verifying | Verified | Failed --verify--> Verifying -> Verified | Failed
//! ```
//!
//! `generate` is re-entrant: it always restarts the pipeline and discards the
//! previous proof, which also recovers a session whose earlier call was
//! dropped mid-flight. `verify` without any proof is a usage error and leaves
//! the phase alone.
//!
//! Both operations take `&mut self`, so two calls can never overlap on one
//! workflow.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::backend::{EngineError, ProofEngine};
use crate::core::{CircuitInputs, ProofResult, ProvingArtifact};
use crate::{WorkflowError, WorkflowResult};

use super::provisioner::ArtifactProvisioner;

/// Message for an engine response that is not a proof object.
pub const INVALID_PROOF_OBJECT: &str = "native module did not return a valid proof object";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Provisioning,
    Generating,
    Ready,
    Verifying,
    Verified,
    Failed,
}

impl Phase {
    /// True while an operation is in flight.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Phase::Provisioning | Phase::Generating | Phase::Verifying
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Provisioning => "provisioning",
            Phase::Generating => "generating",
            Phase::Ready => "ready",
            Phase::Verifying => "verifying",
            Phase::Verified => "verified",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of one session's proof lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub phase: Phase,
    /// Most recent proof; cleared when a new generation starts
    pub last_proof: Option<ProofResult>,
    /// Set only while `phase == Failed`
    pub last_error: Option<WorkflowError>,
    /// Outcome of the last completed verification
    pub last_verdict: Option<bool>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState {
            phase: Phase::Idle,
            last_proof: None,
            last_error: None,
            last_verdict: None,
        }
    }
}

impl WorkflowState {
    /// Whether a caller-facing "generate" control should be enabled.
    pub fn can_generate(&self) -> bool {
        !matches!(self.phase, Phase::Provisioning | Phase::Generating)
    }

    /// Whether a caller-facing "verify" control should be enabled.
    pub fn can_verify(&self) -> bool {
        self.last_proof.is_some() && !self.phase.is_pending()
    }
}

pub struct ProofWorkflow {
    provisioner: ArtifactProvisioner,
    engine: Arc<dyn ProofEngine>,
    state: WorkflowState,
    notifier: watch::Sender<WorkflowState>,
}

impl ProofWorkflow {
    pub fn new(provisioner: ArtifactProvisioner, engine: Arc<dyn ProofEngine>) -> Self {
        let state = WorkflowState::default();
        let (notifier, _) = watch::channel(state.clone());
        ProofWorkflow {
            provisioner,
            engine,
            state,
            notifier,
        }
    }

    /// Current state. Reading it has no side effects.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.state.last_error.as_ref()
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.notifier.subscribe()
    }

    /// Provision the artifact and generate a proof for `inputs`.
    #[tracing::instrument(skip_all, fields(artifact = %artifact.name))]
    pub async fn generate(
        &mut self,
        artifact: &ProvingArtifact,
        inputs: &CircuitInputs,
    ) -> WorkflowResult<ProofResult> {
        self.state.last_proof = None;
        self.state.last_verdict = None;
        self.enter(Phase::Provisioning);

        let path = match self.provisioner.ensure_present(artifact).await {
            Ok(path) => path,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.enter(Phase::Generating);
        let inputs_json = match inputs.to_json() {
            Ok(json) => json,
            Err(e) => return Err(self.fail(WorkflowError::InvalidInput(e.to_string()))),
        };
        let raw = match self.engine.compute_proof(&path, &inputs_json).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(self.classify(e, &path))),
        };

        let result = match ProofResult::from_engine_value(raw) {
            Ok(result) => result,
            Err(detail) => {
                error!(
                    engine = self.engine.name(),
                    path = %path.display(),
                    %detail,
                    "engine returned a malformed proof response"
                );
                return Err(self.fail(WorkflowError::EngineContract(
                    INVALID_PROOF_OBJECT.to_string(),
                )));
            }
        };

        info!(public_inputs = ?result.inputs, "proof generated");
        self.state.last_proof = Some(result.clone());
        self.enter(Phase::Ready);
        Ok(result)
    }

    /// Verify `proof`, or the last generated proof when `None`.
    ///
    /// The artifact is provisioned again first, since it may have been
    /// evicted since generation.
    #[tracing::instrument(skip_all, fields(artifact = %artifact.name))]
    pub async fn verify(
        &mut self,
        artifact: &ProvingArtifact,
        proof: Option<&ProofResult>,
    ) -> WorkflowResult<bool> {
        let candidate = match proof.cloned().or_else(|| self.state.last_proof.clone()) {
            Some(candidate) => candidate,
            None => {
                warn!(phase = %self.state.phase, "verify requested with no proof available");
                return Err(WorkflowError::NoProofAvailable);
            }
        };

        self.state.last_proof = Some(candidate.clone());
        self.state.last_verdict = None;
        self.enter(Phase::Verifying);

        let path = match self.provisioner.ensure_present(artifact).await {
            Ok(path) => path,
            Err(e) => return Err(self.fail(e.into())),
        };

        match self.engine.check_proof(&path, &candidate).await {
            Ok(ok) => {
                info!(ok, "verification finished");
                self.state.last_verdict = Some(ok);
                self.enter(Phase::Verified);
                Ok(ok)
            }
            Err(e) => Err(self.fail(self.classify(e, &path))),
        }
    }

    fn classify(&self, e: EngineError, path: &Path) -> WorkflowError {
        match e {
            EngineError::Failed(message) => WorkflowError::EngineFailure(message),
            EngineError::Malformed(detail) => {
                error!(
                    engine = self.engine.name(),
                    path = %path.display(),
                    %detail,
                    "engine output violates its contract"
                );
                WorkflowError::EngineContract(detail)
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.state.phase, to = %phase, "phase transition");
        self.state.phase = phase;
        self.state.last_error = None;
        self.publish();
    }

    fn fail(&mut self, err: WorkflowError) -> WorkflowError {
        warn!(
            from = %self.state.phase,
            category = err.category(),
            error = %err,
            "workflow failed"
        );
        self.state.phase = Phase::Failed;
        self.state.last_error = Some(err.clone());
        self.publish();
        err
    }

    fn publish(&self) {
        self.notifier.send_replace(self.state.clone());
    }
}
