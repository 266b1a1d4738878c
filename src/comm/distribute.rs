//! Block redistribution of globally ordered data.
//!
//! After sorting or retirement, rank-local slice sizes drift; these
//! helpers restore the equal-block layout (first `total % p` ranks one
//! element larger) while preserving global order. The partition variant
//! rebalances only the active prefix of a buffer, leaving each rank's
//! retired suffix where it is.
//!
//! Uses `tag .. tag + 3` (size gather, payload exchange).

use bytemuck::Pod;

use crate::comm::collective::{all2allv, allgather};
use crate::comm::{CommTag, Communicator};
use crate::error::LogccError;

fn target_offset(total: u64, p: u64, j: u64) -> u64 {
    let base = total / p;
    let rem = total % p;
    j * base + j.min(rem)
}

/// Redistribute `v` so every rank holds an equal block of the global
/// sequence, preserving order.
pub fn block_decompose<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    v: Vec<T>,
) -> Result<Vec<T>, LogccError> {
    let p = comm.size();
    if p == 1 {
        return Ok(v);
    }
    let r = comm.rank();
    let sizes = allgather(comm, tag, v.len() as u64)?;
    let total: u64 = sizes.iter().sum();
    if total == 0 {
        return Ok(Vec::new());
    }
    let my_off: u64 = sizes[..r].iter().sum();
    let my_end = my_off + v.len() as u64;

    let mut counts = vec![0usize; p];
    for (j, c) in counts.iter_mut().enumerate() {
        let t_off = target_offset(total, p as u64, j as u64);
        let t_end = target_offset(total, p as u64, j as u64 + 1);
        let lo = my_off.max(t_off);
        let hi = my_end.min(t_end);
        *c = hi.saturating_sub(lo) as usize;
    }
    all2allv(comm, tag.offset(1), &v, &counts)
}

/// Rebalance the active prefix `v[..pend]` across ranks, keeping each
/// rank's inactive suffix local. Returns the buffer and the new `pend`.
pub fn block_decompose_partition<T: Pod, C: Communicator>(
    comm: &C,
    tag: CommTag,
    mut v: Vec<T>,
    pend: usize,
) -> Result<(Vec<T>, usize), LogccError> {
    let suffix = v.split_off(pend);
    let mut active = block_decompose(comm, tag, v)?;
    let pend = active.len();
    active.extend_from_slice(&suffix);
    Ok((active, pend))
}

/// In-place unstable partition: moves elements failing `keep` behind the
/// returned index. Order within the two halves is not preserved (the
/// next super-step re-sorts the prefix anyway).
pub fn partition_in_place<T, F>(s: &mut [T], keep: F) -> usize
where
    F: Fn(&T) -> bool,
{
    let mut i = 0;
    let mut j = s.len();
    while i < j {
        if keep(&s[i]) {
            i += 1;
        } else {
            j -= 1;
            s.swap(i, j);
        }
    }
    i
}
