//! Synthetic R-MAT edge generator for benchmarking.
//!
//! Recursive-matrix sampling with the classic skewed initiator
//! {0.57, 0.19, 0.19, 0.05}. Each edge is seeded individually from the
//! fixed seed pair and its global index, so the generated multiset is
//! independent of the rank count; ranks generate disjoint index ranges.
//! Every sampled edge is emitted in both orientations, keeping the tuple
//! stream symmetric the same way shared k-mers are.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::comm::Communicator;
use crate::tuple::Tuple;

/// Quadrant probabilities (top-left, top-right, bottom-left,
/// bottom-right).
pub const INITIATOR: [f64; 4] = [0.57, 0.19, 0.19, 0.05];

/// Fixed generator seed pair.
const SEED: u64 = (1 << 32) | 2;

/// Generate this rank's share of `edgefactor * 2^scale` edges as tuples,
/// two per edge (one per orientation). Vertex identifiers span
/// `0..2^scale`, so `scale` must be at most 31 to stay inside the label
/// domain.
pub fn generate<C: Communicator>(comm: &C, scale: u32, edgefactor: u64) -> Vec<Tuple> {
    assert!(scale <= 31, "scale {scale} exceeds the 32-bit label domain");
    let nedges = edgefactor << scale;
    let p = comm.size() as u64;
    let r = comm.rank() as u64;
    let lo = r * nedges / p;
    let hi = (r + 1) * nedges / p;

    let mut out = Vec::with_capacity(2 * (hi - lo) as usize);
    for idx in lo..hi {
        let (u, v) = sample_edge(scale, idx);
        out.push(Tuple::edge(u, v));
        out.push(Tuple::edge(v, u));
    }
    out
}

fn sample_edge(scale: u32, idx: u64) -> (u32, u32) {
    let mut rng =
        ChaCha8Rng::seed_from_u64(SEED ^ idx.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let mut u = 0u32;
    let mut v = 0u32;
    for _ in 0..scale {
        let x: f64 = rng.gen();
        let (bu, bv) = if x < INITIATOR[0] {
            (0, 0)
        } else if x < INITIATOR[0] + INITIATOR[1] {
            (0, 1)
        } else if x < INITIATOR[0] + INITIATOR[1] + INITIATOR[2] {
            (1, 0)
        } else {
            (1, 1)
        };
        u = u << 1 | bu;
        v = v << 1 | bv;
    }
    (u, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{NoComm, ThreadComm};
    use std::thread;

    #[test]
    fn deterministic_and_in_range() {
        let a = generate(&NoComm, 4, 8);
        let b = generate(&NoComm, 4, 8);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2 * 8 << 4);
        assert!(a.iter().all(|t| t.pc < 16 && t.pn < 16));
    }

    #[test]
    fn rank_count_does_not_change_the_multiset() {
        let single = generate(&NoComm, 3, 4);
        let comms = ThreadComm::split_world(3);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| thread::spawn(move || generate(&c, 3, 4)))
            .collect();
        let multi: Vec<Tuple> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(single, multi);
    }

    #[test]
    fn both_orientations_emitted() {
        let v = generate(&NoComm, 3, 2);
        for pair in v.chunks(2) {
            assert_eq!(pair[0].key as u32, pair[1].pc);
            assert_eq!(pair[1].key as u32, pair[0].pc);
        }
    }
}
