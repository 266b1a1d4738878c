//! Input collaborators: tuple stream generators.
//!
//! The engine consumes whatever tuple multiset these produce and never
//! looks back at the source; both generators deal their output across
//! ranks so every rank enters the engine with a non-empty share (for
//! any reasonable input size).

pub mod fastq;
pub mod rmat;
