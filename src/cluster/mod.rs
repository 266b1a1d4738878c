//! The distributed label-propagation engine.
//!
//! [`cluster`] drives the whole pipeline on each rank: the one-time
//! key-bucket reduction, then bulk-synchronous super-steps until every
//! rank votes done. Afterwards [`extract_seeds`] collapses the converged
//! tuples to one representative label per connected component.
//!
//! Three methods are supported. `Standard` keeps the entire local buffer
//! active forever; `Inactive` retires fully converged components behind
//! the active prefix; `LoadBalance` additionally re-blocks the active
//! prefix across ranks after every retirement so stragglers do not pin
//! the run to one rank.

pub mod key_reduce;
pub mod propagate;
pub mod seeds;

use std::fmt;
use std::str::FromStr;

use crate::comm::Communicator;
use crate::error::LogccError;
use crate::tuple::Tuple;

pub use key_reduce::reduce_by_key;
pub use seeds::{extract_seeds, write_seed_file};

/// Tag ranges reserved per collective call site. FIFO per
/// `(src, dst, tag)` lets every super-step reuse the same range.
pub(crate) mod tags {
    use crate::comm::CommTag;

    pub const KEY_SORT: CommTag = CommTag::new(0x10); // ..0x14
    pub const KEY_SPLIT: CommTag = CommTag::new(0x16);
    pub const KEY_SCAN: CommTag = CommTag::new(0x17);
    pub const KEY_RSCAN: CommTag = CommTag::new(0x18);

    pub const STEP_SORT: CommTag = CommTag::new(0x20); // ..0x24
    pub const STEP_SPLIT: CommTag = CommTag::new(0x26);
    pub const PREV_MIN: CommTag = CommTag::new(0x27);
    pub const PREV_EL: CommTag = CommTag::new(0x28);
    pub const NEXT_MAX: CommTag = CommTag::new(0x29);
    pub const BALANCE: CommTag = CommTag::new(0x2c); // ..0x2f
    pub const VOTE: CommTag = CommTag::new(0x32);

    pub const SEED_BAL: CommTag = CommTag::new(0x40); // ..0x43
    pub const SEED_SORT: CommTag = CommTag::new(0x44); // ..0x48
    pub const SEED_SPLITTERS: CommTag = CommTag::new(0x4a); // ..0x4b
    pub const SEED_A2A: CommTag = CommTag::new(0x4c); // ..0x4d
    pub const SEED_GATHER: CommTag = CommTag::new(0x4e); // ..0x4f
}

/// Engine variant selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Method {
    /// Every tuple stays in play until global convergence.
    Standard,
    /// Converged components are retired out of the working prefix.
    Inactive,
    /// Retirement plus block re-decomposition of the surviving prefix.
    LoadBalance,
}

impl Method {
    /// Canonical name, also the seed-file suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Standard => "standard",
            Method::Inactive => "inactive",
            Method::LoadBalance => "loadbalance",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = LogccError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Method::Standard),
            "inactive" => Ok(Method::Inactive),
            "loadbalance" => Ok(Method::LoadBalance),
            other => Err(LogccError::UnknownMethod(other.to_string())),
        }
    }
}

/// Converged engine state of one rank.
#[derive(Debug, Clone)]
pub struct ClusterResult {
    /// All tuples held locally, active prefix first. Every tuple's `pc`
    /// is its component representative.
    pub tuples: Vec<Tuple>,
    /// Number of super-steps until the global done vote passed.
    pub iterations: usize,
}

/// Run the engine to convergence on this rank's share of the tuple
/// stream. Collective: every rank of `comm` must call with its own
/// (non-empty) local buffer.
pub fn cluster<C: Communicator>(
    comm: &C,
    method: Method,
    tuples: Vec<Tuple>,
) -> Result<ClusterResult, LogccError> {
    if tuples.is_empty() {
        return Err(LogccError::EmptyRank(comm.rank()));
    }

    let mut v = reduce_by_key(comm, tuples)?;
    let mut pend = v.len();
    let mut iterations = 0usize;

    loop {
        let all_done = propagate::super_step(comm, method, &mut v, &mut pend)?;
        iterations += 1;
        if comm.rank() == 0 {
            log::debug!("super-step {iterations}: {pend} active tuples on rank 0");
        }
        if all_done {
            break;
        }
    }

    if comm.rank() == 0 {
        log::info!("{method} converged after {iterations} super-steps");
    }
    Ok(ClusterResult {
        tuples: v,
        iterations,
    })
}
