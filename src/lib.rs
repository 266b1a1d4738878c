//! # logcc
//!
//! logcc computes connected components of very large implicit graphs —
//! typically graphs induced by shared k-mers among DNA reads — in
//! parallel across many ranks, assigning every vertex the minimum vertex
//! identifier reachable from it. Convergence takes O(log D) bulk-
//! synchronous super-steps, D being the largest component diameter.
//!
//! ## Structure
//! - [`tuple`] — the `(key, pn, pc)` record the whole engine operates on
//! - [`comm`] — the message-passing substrate and the collective layer
//!   built on it (distributed sort, scans, shifts, all-to-all, block
//!   decomposition), with serial, in-process and MPI backends
//! - [`cluster`] — the engine: one-time key reduction, the label
//!   propagation loop in its three variants, seed extraction
//! - [`gen`] — input collaborators (FASTQ k-mer stream, synthetic R-MAT)
//!
//! ## Usage
//! Every rank builds its local tuple stream, then the group runs the
//! engine collectively:
//!
//! ```
//! use logcc::comm::NoComm;
//! use logcc::cluster::{cluster, extract_seeds, Method};
//! use logcc::tuple::Tuple;
//!
//! let comm = NoComm;
//! let tuples = vec![Tuple::edge(1, 2), Tuple::edge(2, 1)];
//! let result = cluster(&comm, Method::Standard, tuples).unwrap();
//! let seeds = extract_seeds(&comm, result.tuples).unwrap();
//! assert_eq!(seeds, vec![1]);
//! ```

pub mod cluster;
pub mod comm;
pub mod error;
pub mod gen;
pub mod tuple;

/// A convenient prelude importing the most-used types and entry points.
pub mod prelude {
    pub use crate::cluster::{
        cluster, extract_seeds, reduce_by_key, write_seed_file, ClusterResult, Method,
    };
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::{CommTag, Communicator, NoComm, ThreadComm, Wait};
    pub use crate::error::LogccError;
    pub use crate::tuple::{Tuple, ALMOST_INACTIVE, INACTIVE};
}
