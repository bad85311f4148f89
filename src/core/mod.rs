//! Core types: the artifact and proof data model plus configuration.

pub mod config;
pub mod schema;

pub use config::{ArtifactConfig, EngineConfig, ProverConfig, load_config, parse_config};
pub use schema::{CircuitInputs, InputError, ProofResult, ProvingArtifact};
