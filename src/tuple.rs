//! The engine's unit of state: a fixed `(key, pn, pc)` triple.
//!
//! `key` identifies a vertex or k-mer occurrence and is only ever used by
//! the one-time key reduction; after that the engine sorts and buckets on
//! the two partition labels. `pc` is the partition a tuple currently
//! belongs to, `pn` the candidate it proposes for the next round.
//!
//! Tuples travel between ranks as raw bytes, so the struct is `#[repr(C)]`
//! and `bytemuck::Pod` with no padding (16 bytes, checked below), the same
//! wire conventions the communication layer assumes everywhere: fixed
//! width, little-endian hosts on both sides.

use bytemuck::{Pod, Zeroable};
use std::cmp::Ordering;

/// Label marking a tuple as retired. Retired tuples sit behind the active
/// prefix and are never re-sorted or re-compared.
pub const INACTIVE: u32 = u32::MAX;

/// Label marking a tuple whose bucket is self-consistent but must stay
/// visible for one more round so neighboring buckets can still read its
/// label. Promoted to [`INACTIVE`] the following round.
pub const ALMOST_INACTIVE: u32 = u32::MAX - 1;

/// One element of the distributed working set.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Tuple {
    /// Vertex / k-mer identifier. Opaque to the main loop.
    pub key: u64,
    /// Candidate partition label for the next round.
    pub pn: u32,
    /// Current partition label.
    pub pc: u32,
}

const _: () = assert!(std::mem::size_of::<Tuple>() == 16);
const _: () = assert!(std::mem::align_of::<Tuple>() == 8);

impl Tuple {
    #[inline]
    pub const fn new(key: u64, pn: u32, pc: u32) -> Self {
        Self { key, pn, pc }
    }

    /// Tuple for one directed edge occurrence `u -> v`: keyed by the
    /// source endpoint, labeled by the target.
    #[inline]
    pub const fn edge(u: u32, v: u32) -> Self {
        Self::new(u as u64, u, v)
    }

    /// Tuple for one (read, k-mer) incidence: keyed by the k-mer, with
    /// both labels starting at the owning read.
    #[inline]
    pub const fn kmer(kmer_id: u64, read_id: u32) -> Self {
        Self::new(kmer_id, read_id, read_id)
    }

    /// Whether the tuple still participates in super-steps.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.pn != INACTIVE
    }

    /// Total order on `key` alone; used once, by the key reduction.
    #[inline]
    pub fn by_key(a: &Tuple, b: &Tuple) -> Ordering {
        a.key.cmp(&b.key)
    }

    /// Lexicographic `(pc, pn)`; the main-loop sort order. Within a
    /// bucket the smallest candidate label comes first.
    #[inline]
    pub fn by_pc_pn(a: &Tuple, b: &Tuple) -> Ordering {
        (a.pc, a.pn).cmp(&(b.pc, b.pn))
    }

    /// Order on `pc` alone; used by seed extraction.
    #[inline]
    pub fn by_pc(a: &Tuple, b: &Tuple) -> Ordering {
        a.pc.cmp(&b.pc)
    }

    /// Prefix-scan reducer. Of two tuples it keeps the one in the later
    /// bucket (greater `pc`); within the same bucket it keeps the smaller
    /// `pn`. Folding each rank's "first element of its last bucket"
    /// through this yields, for every rank, the minimum entry of the
    /// bucket crossing its left edge.
    #[inline]
    pub fn left_min(a: &Tuple, b: &Tuple) -> Tuple {
        if a.pc == b.pc {
            if a.pn <= b.pn { *a } else { *b }
        } else if a.pc > b.pc {
            *a
        } else {
            *b
        }
    }

    /// Suffix-scan reducer, the mirror of [`Tuple::left_min`]: keeps the
    /// tuple in the earlier bucket (smaller `pc`), resolving same-bucket
    /// ties to the larger `pn`. Folding each rank's "last element of its
    /// first bucket" through this yields the maximum entry of the bucket
    /// crossing each rank's right edge.
    #[inline]
    pub fn right_max(a: &Tuple, b: &Tuple) -> Tuple {
        if a.pc == b.pc {
            if a.pn >= b.pn { *a } else { *b }
        } else if a.pc < b.pc {
            *a
        } else {
            *b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orderings() {
        let a = Tuple::new(3, 1, 2);
        let b = Tuple::new(1, 9, 2);
        let c = Tuple::new(2, 0, 5);
        assert_eq!(Tuple::by_key(&a, &b), Ordering::Greater);
        assert_eq!(Tuple::by_pc_pn(&a, &b), Ordering::Less);
        assert_eq!(Tuple::by_pc_pn(&b, &c), Ordering::Less);
        assert_eq!(Tuple::by_pc(&a, &b), Ordering::Equal);
    }

    #[test]
    fn left_min_prefers_later_bucket_then_smaller_pn() {
        let lo = Tuple::new(0, 7, 4);
        let hi = Tuple::new(0, 9, 8);
        assert_eq!(Tuple::left_min(&lo, &hi), hi);
        assert_eq!(Tuple::left_min(&hi, &lo), hi);
        let same_a = Tuple::new(0, 3, 8);
        assert_eq!(Tuple::left_min(&hi, &same_a), same_a);
    }

    #[test]
    fn right_max_prefers_earlier_bucket_then_larger_pn() {
        let lo = Tuple::new(0, 7, 4);
        let hi = Tuple::new(0, 9, 8);
        assert_eq!(Tuple::right_max(&lo, &hi), lo);
        assert_eq!(Tuple::right_max(&hi, &lo), lo);
        let same_a = Tuple::new(0, 9, 4);
        assert_eq!(Tuple::right_max(&lo, &same_a), same_a);
    }

    #[test]
    fn reducers_are_associative() {
        let xs = [
            Tuple::new(0, 5, 1),
            Tuple::new(0, 2, 3),
            Tuple::new(0, 9, 3),
            Tuple::new(0, 1, 7),
        ];
        let fold_l = |f: fn(&Tuple, &Tuple) -> Tuple| {
            xs.iter().skip(1).fold(xs[0], |acc, t| f(&acc, t))
        };
        let fold_r = |f: fn(&Tuple, &Tuple) -> Tuple| {
            let mut it = xs.iter().rev();
            let last = *it.next().unwrap();
            it.fold(last, |acc, t| f(t, &acc))
        };
        assert_eq!(fold_l(Tuple::left_min), fold_r(Tuple::left_min));
        assert_eq!(fold_l(Tuple::right_max), fold_r(Tuple::right_max));
    }

    #[test]
    fn sentinels_sort_last_within_bucket() {
        let mut v = [
            Tuple::new(0, ALMOST_INACTIVE, 3),
            Tuple::new(0, 1, 3),
            Tuple::new(0, 2, 3),
        ];
        v.sort_by(Tuple::by_pc_pn);
        assert_eq!(v[0].pn, 1);
        assert_eq!(v[2].pn, ALMOST_INACTIVE);
    }
}
