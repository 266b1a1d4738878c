//! One bulk-synchronous super-step of label propagation.
//!
//! The active prefix is sorted globally by `(pc, pn)`, so each
//! `pc`-bucket is a contiguous run whose first element carries the
//! bucket's smallest candidate label. Buckets may straddle rank
//! boundaries; before walking, every rank learns
//!
//! - the minimum entry of the bucket crossing its left edge (prefix scan
//!   of each rank's "first element of its last bucket"),
//! - the maximum entry of the bucket crossing its right edge (suffix
//!   scan of each rank's "last element of its first bucket"),
//! - its left neighbor's final element, to tell whether its first bucket
//!   is a continuation.
//!
//! Ranks with an empty active prefix drop out of these scans via a
//! subgroup of the non-empty ranks; they still take part in the
//! termination vote and (in the load-balancing variant) the
//! re-decomposition.
//!
//! The bucket walk rebroadcasts each bucket's minimum label to the
//! partitions named by the other `pn` values it sees, suppressing
//! duplicates and flipping exactly one carrier per bucket per round; a
//! bucket that saw no in-place flip appends a synthesized one. In the
//! retirement variants a converged self-consistent bucket is first
//! demoted to a one-round witness (`ALMOST_INACTIVE`) and then retired
//! (`INACTIVE`) behind the active prefix.

use crate::cluster::{tags, Method};
use crate::comm::collective::{exscan, rev_exscan, right_shift, split, test_all};
use crate::comm::distribute::{block_decompose_partition, partition_in_place};
use crate::comm::{sort, Communicator};
use crate::error::LogccError;
use crate::tuple::{Tuple, ALMOST_INACTIVE, INACTIVE};

/// Cross-boundary state for the bucket walk. `None` where the rank is
/// the first (or last) non-empty rank and no neighbor exists.
struct Boundary {
    prev_min: Option<Tuple>,
    prev_el: Option<Tuple>,
    next_max: Option<Tuple>,
}

/// Run one super-step. Updates `v` and `pend` in place and returns the
/// global done vote. Collective over all ranks of `comm`.
pub fn super_step<C: Communicator>(
    comm: &C,
    method: Method,
    v: &mut Vec<Tuple>,
    pend: &mut usize,
) -> Result<bool, LogccError> {
    let retire = method != Method::Standard;

    // 1. sort the active prefix globally, keeping the retired suffix local
    let suffix = v.split_off(*pend);
    let sorted = sort::sort(comm, tags::STEP_SORT, std::mem::take(v), Tuple::by_pc_pn)?;
    *v = sorted;
    let mut pend_local = v.len();
    v.extend_from_slice(&suffix);

    // 2. boundary state over the non-empty subgroup
    let sub = split(comm, tags::STEP_SPLIT, pend_local > 0)?;
    let boundary = match &sub {
        Some(sub) => {
            let active = &v[..pend_local];
            let last = active[pend_local - 1];
            let last_bucket_start = active.partition_point(|t| t.pc < last.pc);
            let first = active[0];
            let first_bucket_end = active.partition_point(|t| t.pc <= first.pc);
            Boundary {
                prev_min: exscan(sub, tags::PREV_MIN, active[last_bucket_start], Tuple::left_min)?,
                prev_el: right_shift(sub, tags::PREV_EL, last)?,
                next_max: rev_exscan(
                    sub,
                    tags::NEXT_MAX,
                    active[first_bucket_end - 1],
                    Tuple::right_max,
                )?,
            }
        }
        None => Boundary {
            prev_min: None,
            prev_el: None,
            next_max: None,
        },
    };

    // 3. bucket walk
    let mut newtuples = Vec::new();
    let done = walk_buckets(&mut v[..pend_local], &boundary, retire, &mut newtuples);

    // 4. append the flips; in the retirement variants splice them ahead
    // of the retired suffix, then move freshly retired tuples behind a
    // new prefix end
    if retire {
        let nnew = newtuples.len();
        let active_size = pend_local;
        let inactive_size = v.len() - pend_local;
        v.extend_from_slice(&newtuples);
        let len = v.len();
        for i in 0..nnew.min(inactive_size) {
            v.swap(active_size + i, len - 1 - i);
        }
        pend_local = active_size + nnew;
        pend_local = partition_in_place(&mut v[..pend_local], Tuple::is_active);
        if method == Method::LoadBalance {
            let (balanced, new_pend) =
                block_decompose_partition(comm, tags::BALANCE, std::mem::take(v), pend_local)?;
            *v = balanced;
            pend_local = new_pend;
        }
    } else {
        v.extend_from_slice(&newtuples);
        pend_local = v.len();
    }
    *pend = pend_local;

    // 5. termination vote over the full group
    test_all(comm, tags::VOTE, done)
}

/// Walk the sorted active prefix bucket by bucket, applying the
/// singleton / converged / flip rules. Returns this rank's done flag.
fn walk_buckets(
    active: &mut [Tuple],
    boundary: &Boundary,
    retire: bool,
    newtuples: &mut Vec<Tuple>,
) -> bool {
    let n = active.len();
    let mut done = true;
    let mut begin = 0usize;

    while begin < n {
        let pc = active[begin].pc;
        let end = begin + active[begin..].partition_point(|t| t.pc == pc);

        // A continuation bucket can only be the rank's first one.
        let left_shared = boundary.prev_el.map_or(false, |p| p.pc == pc);

        let mut min_pn = active[begin].pn;
        if let Some(pm) = &boundary.prev_min {
            if pm.pc == pc {
                min_pn = pm.pn;
            }
        }
        let mut max_pn = active[end - 1].pn;
        if let Some(nm) = &boundary.next_max {
            if nm.pc == pc {
                max_pn = nm.pn;
            }
        }

        // Singleton bucket wholly owned here: it departs to its
        // candidate partition immediately.
        if end - begin == 1 && !left_shared {
            let t = &mut active[begin];
            if retire && t.pn == ALMOST_INACTIVE {
                t.pn = INACTIVE;
            } else {
                t.pc = t.pn;
            }
            begin = end;
            continue;
        }

        // Converged bucket: every member already proposes the same label.
        if min_pn == max_pn {
            if retire && max_pn == ALMOST_INACTIVE {
                for t in &mut active[begin..end] {
                    t.pn = INACTIVE;
                }
            } else if retire && active[begin].pc == max_pn {
                // self-consistent; stay visible as a witness one more round
                for t in &mut active[begin..end] {
                    t.pn = ALMOST_INACTIVE;
                }
            } else {
                for t in &mut active[begin..end] {
                    t.pc = t.pn;
                }
            }
            begin = end;
            continue;
        }

        // Live bucket.
        if retire && min_pn > active[begin].pc {
            min_pn = active[begin].pc;
        }
        done = false;

        let mut found_flip = false;
        let mut it = begin;
        let mut prev_pn;
        if left_shared {
            prev_pn = boundary.prev_el.expect("left-shared bucket has a left neighbor").pn;
        } else {
            // the first element is the bucket minimum; leave it in place
            if retire && active[begin].pn > min_pn {
                active[begin].pn = min_pn;
            }
            prev_pn = min_pn;
            it += 1;
        }

        while it < end {
            let t = &mut active[it];
            if retire && t.pn == ALMOST_INACTIVE {
                // rejoined an unconverged bucket; drop the witness mark
                t.pn = t.pc;
            }
            let cur_pn = t.pn;
            if t.pn == prev_pn || t.pn == t.pc {
                // carries no new edge
                if !found_flip {
                    found_flip = true;
                    t.pn = t.pc;
                    t.pc = min_pn;
                } else {
                    t.pn = min_pn;
                    t.pc = min_pn;
                }
            } else {
                // forward the bucket minimum into the partition this
                // entry came from
                std::mem::swap(&mut t.pn, &mut t.pc);
                t.pn = min_pn;
            }
            prev_pn = cur_pn;
            it += 1;
        }

        if !found_flip {
            let mut t = active[begin];
            std::mem::swap(&mut t.pn, &mut t.pc);
            newtuples.push(t);
        }

        begin = end;
    }
    done
}
