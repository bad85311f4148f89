//! Proof engine abstraction.
//!
//! The workflow drives proving and verification through the `ProofEngine`
//! trait and never touches the proof system directly.

pub mod command;
pub mod mock;
pub mod traits;

// Re-export key types
pub use command::{CommandEngine, CommandEngineConfig};
pub use mock::{EngineCall, MockEngine, MockEngineConfig};
pub use traits::{EngineError, EngineResult, ProofEngine};
