//! Unified error type for the logcc public APIs.
//!
//! Library entry points return `Result<_, LogccError>`; nothing in the
//! engine retries. A communication failure on one rank is fatal for the
//! whole run, so errors carry enough context to name the failing peer
//! and phase before the process group goes down together.

use thiserror::Error;

/// Unified error type for logcc operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogccError {
    /// A rank entered the engine with no tuples. Every rank must receive
    /// input from its generator; an empty buffer is a collaborator
    /// contract violation, not a recoverable condition.
    #[error("rank {0} holds an empty tuple buffer; every rank must contribute input")]
    EmptyRank(usize),

    /// A receive posted against `peer` never produced data.
    #[error("receive from rank {peer} failed during {phase}")]
    Recv { peer: usize, phase: &'static str },

    /// Unrecognized engine method name on the command line.
    #[error("unknown method `{0}` (expected standard, inactive or loadbalance)")]
    UnknownMethod(String),

    /// Malformed input from a generator collaborator.
    #[error("input parse error: {0}")]
    Parse(String),

    /// Seed-file I/O failure (rank 0 only writes; other ranks never touch
    /// the output path).
    #[error("seed file I/O: {0}")]
    Io(String),
}

impl From<std::io::Error> for LogccError {
    fn from(e: std::io::Error) -> Self {
        LogccError::Io(e.to_string())
    }
}
