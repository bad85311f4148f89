//! Mock engine for testing.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::ProofResult;

use super::traits::{EngineError, EngineResult, ProofEngine};

/// Configuration for mock engine responses.
#[derive(Debug, Clone)]
pub struct MockEngineConfig {
    /// Name to report
    pub name: String,
    /// Raw value `compute_proof` returns
    pub prove_response: Value,
    /// Verdict `check_proof` returns
    pub verify_result: bool,
    /// Error `compute_proof` raises, if set
    pub prove_error: Option<String>,
    /// Error `check_proof` raises, if set
    pub verify_error: Option<String>,
}

/// A Groth16-shaped proof for `3 * 4 = 12`.
pub fn sample_proof() -> Value {
    json!({
        "a": {"x": "1", "y": "2"},
        "b": {"x": ["3", "4"], "y": ["5", "6"]},
        "c": {"x": "7", "y": "8"},
        "protocol": "groth16",
        "curve": "bn128"
    })
}

impl MockEngineConfig {
    /// Create a new mock config with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        MockEngineConfig {
            name: name.into(),
            prove_response: json!({"proof": sample_proof(), "inputs": ["12"]}),
            verify_result: true,
            prove_error: None,
            verify_error: None,
        }
    }

    /// Set the raw prove response.
    pub fn with_prove_response(mut self, response: Value) -> Self {
        self.prove_response = response;
        self
    }

    /// Set the verification verdict.
    pub fn with_verify_result(mut self, ok: bool) -> Self {
        self.verify_result = ok;
        self
    }

    /// Make compute_proof fail.
    pub fn prove_fails(mut self, message: impl Into<String>) -> Self {
        self.prove_error = Some(message.into());
        self
    }

    /// Make check_proof fail.
    pub fn verify_fails(mut self, message: impl Into<String>) -> Self {
        self.verify_error = Some(message.into());
        self
    }
}

/// A recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Prove { artifact: PathBuf, inputs_json: String },
    Verify { artifact: PathBuf, proof: ProofResult },
}

/// Mock engine for unit testing.
///
/// Returns configurable canned results without performing any proving.
pub struct MockEngine {
    config: Mutex<MockEngineConfig>,
    calls: Mutex<Vec<EngineCall>>,
}

impl MockEngine {
    pub fn new(config: MockEngineConfig) -> Self {
        MockEngine {
            config: Mutex::new(config),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock engine with default configuration.
    pub fn default_mock() -> Self {
        Self::new(MockEngineConfig::new("mock"))
    }

    pub fn reconfigure(&self, config: MockEngineConfig) {
        *lock(&self.config) = config;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    pub fn prove_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, EngineCall::Prove { .. }))
            .count()
    }

    pub fn verify_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, EngineCall::Verify { .. }))
            .count()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ProofEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compute_proof(&self, artifact: &Path, inputs_json: &str) -> EngineResult<Value> {
        lock(&self.calls).push(EngineCall::Prove {
            artifact: artifact.to_path_buf(),
            inputs_json: inputs_json.to_string(),
        });
        let config = lock(&self.config).clone();
        match config.prove_error {
            Some(message) => Err(EngineError::Failed(message)),
            None => Ok(config.prove_response),
        }
    }

    async fn check_proof(&self, artifact: &Path, proof: &ProofResult) -> EngineResult<bool> {
        lock(&self.calls).push(EngineCall::Verify {
            artifact: artifact.to_path_buf(),
            proof: proof.clone(),
        });
        let config = lock(&self.config).clone();
        match config.verify_error {
            Some(message) => Err(EngineError::Failed(message)),
            None => Ok(config.verify_result),
        }
    }
}
