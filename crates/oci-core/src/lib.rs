//! Op-Code Interpreters - Core Library
//!
//! Interpreters for one-instruction-set computers and related minimal
//! machines whose whole state is loaded from a flat "genetic string".
//! Public API surface for the OCI core.

pub mod error;
pub mod config;
pub mod bytecode;
pub mod genome;
pub mod vm;
pub mod machines;

// Re-export commonly used types
pub use error::{OciError, OciResult};
pub use config::MachineConfig;
pub use vm::interpreter::{Interpreter, Machine, Oci, RunSummary, StopReason};
pub use machines::{build, Instrumentation, MachineKind};
pub use machines::{HarvardOci, RegisterOci, StackOci, VonNeumannOci};
