//! Seed extraction and seed-file output.
//!
//! After convergence every tuple's `pc` is its component representative;
//! this module collapses the global multiset of labels to one tuple per
//! distinct `pc` and gathers the survivors on rank 0.
//!
//! Deduplication is two-stage: a local first-occurrence pass over the
//! globally sorted labels, then an all-to-all that routes every rank's
//! candidates into the range owned by the rank whose leading seed they
//! fall under, so duplicates created at rank boundaries meet on one rank
//! and die in a final sort-and-dedup.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cluster::{tags, Method};
use crate::comm::collective::{all2allv, allgatherv, gather_to_root};
use crate::comm::distribute::block_decompose;
use crate::comm::{sort, Communicator};
use crate::error::LogccError;
use crate::tuple::Tuple;

/// Collapse the converged tuples to one representative per component.
/// Collective; rank 0 receives the full seed list, every other rank an
/// empty one.
pub fn extract_seeds<C: Communicator>(
    comm: &C,
    mut v: Vec<Tuple>,
) -> Result<Vec<u32>, LogccError> {
    // retirement may have left pn at a sentinel; normalize first
    for t in v.iter_mut() {
        t.pn = t.pc;
    }

    let p = comm.size();
    let v = if p > 1 {
        let v = block_decompose(comm, tags::SEED_BAL, v)?;
        sort::sort(comm, tags::SEED_SORT, v, Tuple::by_pc)?
    } else {
        v.sort_by(Tuple::by_pc);
        v
    };

    // local first occurrence of each distinct pc
    let mut seeds: Vec<Tuple> = Vec::new();
    for t in &v {
        if seeds.last().map_or(true, |s| s.pc < t.pc) {
            seeds.push(*t);
        }
    }

    if p > 1 {
        // Route candidates by each non-zero rank's leading seed so equal
        // labels from both sides of a boundary land on one rank.
        let my_splitter: Vec<Tuple> = if comm.rank() > 0 && !seeds.is_empty() {
            vec![seeds[0]]
        } else {
            Vec::new()
        };
        let splitters = allgatherv(comm, tags::SEED_SPLITTERS, &my_splitter)?;

        let mut counts = vec![0usize; p];
        let mut b = 0usize;
        for (i, s) in splitters.iter().enumerate() {
            let e = b + seeds[b..].partition_point(|x| x.pc < s.pc);
            counts[i] = e - b;
            b = e;
        }
        counts[splitters.len()] = seeds.len() - b;

        seeds = all2allv(comm, tags::SEED_A2A, &seeds, &counts)?;
        seeds.sort_by(Tuple::by_pc);
        seeds.dedup_by(|a, b| a.pc == b.pc);
    }

    let gathered = gather_to_root(comm, tags::SEED_GATHER, &seeds)?;
    Ok(gathered.into_iter().map(|t| t.pc).collect())
}

/// Write one representative per line to `<path>.<method>`. Returns the
/// path written. Only rank 0 should call this.
pub fn write_seed_file(
    path: &Path,
    method: Method,
    seeds: &[u32],
) -> Result<PathBuf, LogccError> {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(".");
    name.push(method.as_str());
    let out = PathBuf::from(name);

    let file = File::create(&out)?;
    let mut w = BufWriter::new(file);
    for s in seeds {
        writeln!(w, "{s}")?;
    }
    w.flush()?;
    Ok(out)
}
