//! Engine module: orchestrates artifact provisioning and the proof lifecycle.
//!
//! # Architecture
//!
//! - **ArtifactProvisioner**: makes sure the proving key is on local storage
//!   and passes the size check, talking to a `Transport`.
//! - **ProofWorkflow**: owns the phase state machine and drives
//!   provision -> prove -> verify against a `ProofEngine`.
//! - **ProofSession**: binds one artifact to one workflow for a caller.
//!
//! # Boundaries
//!
//! - The provisioner is the only component that mutates the artifact file.
//! - The engine and the caller only read it by path.

pub mod locks;
pub mod provisioner;
pub mod session;
pub mod workflow;

// Re-export key types for convenience
pub use locks::ArtifactLocks;
pub use provisioner::ArtifactProvisioner;
pub use session::ProofSession;
pub use workflow::{INVALID_PROOF_OBJECT, Phase, ProofWorkflow, WorkflowState};
