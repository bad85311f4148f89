//! Proof engine trait: the opaque cryptographic collaborator.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::ProofResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine raised an error while proving or checking.
    #[error("{0}")]
    Failed(String),
    /// The engine produced output this crate cannot interpret.
    #[error("malformed engine output: {0}")]
    Malformed(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Proof generation and verification for a compiled circuit.
///
/// Implementations receive a bare filesystem path to the proving key; they
/// never see the `file://` form.
#[async_trait]
pub trait ProofEngine: Send + Sync {
    /// Returns the engine name (e.g., "command", "mock").
    fn name(&self) -> &str;

    /// Generate a proof.
    ///
    /// # Arguments
    /// * `artifact` - Path to the proving key
    /// * `inputs_json` - Circuit inputs as a JSON object of decimal-string arrays
    ///
    /// # Returns
    /// The raw engine response. Its shape is validated by the caller.
    async fn compute_proof(&self, artifact: &Path, inputs_json: &str) -> EngineResult<Value>;

    /// Check a proof. Must be a pure function of its arguments.
    async fn check_proof(&self, artifact: &Path, proof: &ProofResult) -> EngineResult<bool>;
}
