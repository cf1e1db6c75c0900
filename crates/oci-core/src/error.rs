//! OCI Error Types
//!
//! Defines the error conditions produced while configuring an interpreter or
//! loading a genetic string. Nothing that happens inside a running machine is
//! an error: wraparound and self-modification are machine semantics, and every
//! halting condition is a normal termination.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OciError {
    /// A segment size or budget the machine cannot work with.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// Genetic string shorter than the machine layout requires.
    #[error("malformed genome: expected at least {expected} bytes, got {actual}")]
    MalformedGenome { expected: usize, actual: usize },

    /// Decoder description that is not a complete prefix code over one byte.
    #[error("invalid instruction set: {0}")]
    InvalidInstructionSet(String),
}

impl OciError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        OciError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

pub type OciResult<T> = Result<T, OciError>;
