//! One-time key-bucket label reduction.
//!
//! The tuple stream arrives grouped by nothing: every (read, k-mer)
//! incidence or edge occurrence is its own tuple. This step sorts the
//! stream globally by `key` and, for every maximal run of equal keys,
//! folds the run's smallest label into every member's `pn`. Afterwards
//! the key field is never consulted again.
//!
//! A run may straddle rank boundaries. Each rank contributes the
//! `(key, min)` of its edge runs to a pair of exclusive scans with a
//! keyed merge, so every rank learns the portion of its first and last
//! runs living on other ranks before it writes any `pn`. Singleton runs
//! need no special case: the minimum of a one-element run is the
//! element's own smaller label.

use bytemuck::{Pod, Zeroable};

use crate::cluster::tags;
use crate::comm::collective::{exscan, rev_exscan, split};
use crate::comm::{sort, Communicator};
use crate::error::LogccError;
use crate::tuple::Tuple;

/// Scan carry: the minimum label seen so far for a boundary run.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct RunCarry {
    key: u64,
    min: u32,
    _pad: u32,
}

impl RunCarry {
    fn new(key: u64, min: u32) -> Self {
        Self { key, min, _pad: 0 }
    }
}

/// Keyed merge: a carry for a different key supersedes the accumulator;
/// the same key folds minima together. `next` is the contribution from
/// the rank nearer the receiver, so its key decides.
fn merge_carry(acc: &RunCarry, next: &RunCarry) -> RunCarry {
    if acc.key == next.key {
        RunCarry::new(next.key, acc.min.min(next.min))
    } else {
        *next
    }
}

fn label_min(t: &Tuple) -> u32 {
    t.pn.min(t.pc)
}

/// Sort all tuples globally by key and set every tuple's `pn` to the
/// smallest label of its key bucket. Collective.
pub fn reduce_by_key<C: Communicator>(
    comm: &C,
    v: Vec<Tuple>,
) -> Result<Vec<Tuple>, LogccError> {
    let mut v = sort::sort(comm, tags::KEY_SORT, v, Tuple::by_key)?;

    let sub = match split(comm, tags::KEY_SPLIT, !v.is_empty())? {
        Some(sub) => sub,
        None => return Ok(v),
    };

    let n = v.len();
    let first_key = v[0].key;
    let first_end = v.partition_point(|t| t.key == first_key);
    let last_key = v[n - 1].key;
    let last_start = v.partition_point(|t| t.key < last_key);

    let edge_min = |s: &[Tuple]| s.iter().map(label_min).min().expect("non-empty run");
    let carry_last = RunCarry::new(last_key, edge_min(&v[last_start..]));
    let carry_first = RunCarry::new(first_key, edge_min(&v[..first_end]));

    let prev = exscan(&sub, tags::KEY_SCAN, carry_last, merge_carry)?;
    let next = rev_exscan(&sub, tags::KEY_RSCAN, carry_first, merge_carry)?;

    let mut begin = 0usize;
    while begin < n {
        let key = v[begin].key;
        let end = begin + v[begin..].partition_point(|t| t.key == key);
        let mut m = edge_min(&v[begin..end]);
        if begin == 0 {
            if let Some(pv) = &prev {
                if pv.key == key {
                    m = m.min(pv.min);
                }
            }
        }
        if end == n {
            if let Some(nx) = &next {
                if nx.key == key {
                    m = m.min(nx.min);
                }
            }
        }
        for t in &mut v[begin..end] {
            t.pn = m;
        }
        begin = end;
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{NoComm, ThreadComm};
    use std::thread;

    #[test]
    fn kmer_buckets_take_min_read_id() {
        // k-mer 7 shared by reads 4 and 2; k-mer 9 only in read 4
        let v = vec![
            Tuple::kmer(7, 4),
            Tuple::kmer(9, 4),
            Tuple::kmer(7, 2),
        ];
        let out = reduce_by_key(&NoComm, v).unwrap();
        assert_eq!(out[0], Tuple::new(7, 2, 2));
        assert_eq!(out[1], Tuple::new(7, 2, 4));
        assert_eq!(out[2], Tuple::new(9, 4, 4));
    }

    #[test]
    fn edge_buckets_fold_in_source_endpoint() {
        // edges (5,9) and (5,3): bucket of key 5 must settle on 3
        let v = vec![Tuple::edge(5, 9), Tuple::edge(5, 3)];
        let out = reduce_by_key(&NoComm, v).unwrap();
        assert!(out.iter().all(|t| t.key == 5 && t.pn == 3));
    }

    #[test]
    fn run_spanning_three_ranks_converges_to_global_min() {
        // every rank holds tuples of the same key; the minimum lives on
        // the last rank and must reach all of them
        let inputs: Vec<Vec<Tuple>> = vec![
            vec![Tuple::kmer(42, 30), Tuple::kmer(42, 31)],
            vec![Tuple::kmer(42, 20)],
            vec![Tuple::kmer(42, 10), Tuple::kmer(42, 40)],
        ];
        let comms = ThreadComm::split_world(3);
        let handles: Vec<_> = comms
            .into_iter()
            .zip(inputs)
            .map(|(c, v)| thread::spawn(move || reduce_by_key(&c, v).unwrap()))
            .collect();
        let got: Vec<Tuple> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(got.len(), 5);
        assert!(got.iter().all(|t| t.pn == 10), "got: {got:?}");
    }
}
