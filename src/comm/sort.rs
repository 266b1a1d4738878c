//! Distributed sample sort.
//!
//! Local sort, splitter selection from gathered samples, personalized
//! all-to-all by splitter ranges, final local merge. After the call every
//! rank holds a contiguous slice of the global order; slice sizes track
//! the splitter distribution rather than being rebalanced (callers that
//! need balance follow up with a block decomposition).
//!
//! The result is deterministic for a fixed input multiset and rank
//! count: splitter choice, lower-bound routing and the stable local sort
//! leave no ties to chance. Empty ranks contribute no samples and
//! receive whatever their splitter range covers.
//!
//! Uses `tag .. tag + 4` (sample gather, payload exchange).

use bytemuck::Pod;
use std::cmp::Ordering;

use crate::comm::collective::{all2allv, allgatherv};
use crate::comm::{CommTag, Communicator};
use crate::error::LogccError;

/// Globally sort `v` across all ranks of `comm` under `cmp`.
pub fn sort<T, C, F>(comm: &C, tag: CommTag, mut v: Vec<T>, cmp: F) -> Result<Vec<T>, LogccError>
where
    T: Pod,
    C: Communicator,
    F: Fn(&T, &T) -> Ordering + Copy,
{
    v.sort_by(cmp);
    let p = comm.size();
    if p == 1 {
        return Ok(v);
    }

    // Sample the local run: everything when small, else p evenly spaced
    // elements. Small ranks thus stay represented in splitter selection.
    let n = v.len();
    let samples: Vec<T> = if n <= p {
        v.clone()
    } else {
        (1..=p).map(|i| v[(i - 1) * n / p + n / (2 * p)]).collect()
    };

    let mut all_samples = allgatherv(comm, tag, &samples)?;
    if all_samples.is_empty() {
        // nothing anywhere
        return Ok(v);
    }
    all_samples.sort_by(cmp);

    let m = all_samples.len();
    let splitters: Vec<T> = (1..p).map(|i| all_samples[i * m / p]).collect();

    // Route: bucket i gets everything below splitter i (lower bound), so
    // equal elements stay together on one rank.
    let mut counts = vec![0usize; p];
    let mut begin = 0usize;
    for (i, s) in splitters.iter().enumerate() {
        let e = begin + v[begin..].partition_point(|x| cmp(x, s) == Ordering::Less);
        counts[i] = e - begin;
        begin = e;
    }
    counts[p - 1] = n - begin;

    let mut out = all2allv(comm, tag.offset(2), &v, &counts)?;
    out.sort_by(cmp);
    Ok(out)
}
