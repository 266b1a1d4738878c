//! Shared helpers for the integration tests: edge-list lowering, a
//! sequential union-find reference, and runners for single- and
//! multi-rank pipelines.
#![allow(dead_code)]

use std::collections::HashMap;
use std::thread;

use logcc::cluster::{cluster, extract_seeds, Method};
use logcc::comm::{Communicator, NoComm, ThreadComm};
use logcc::tuple::Tuple;

pub const METHODS: [Method; 3] = [Method::Standard, Method::Inactive, Method::LoadBalance];

/// Lower unordered edges to the engine's tuple stream (one tuple per
/// orientation, the same symmetry a shared k-mer produces).
pub fn tuples_from_edges(edges: &[(u32, u32)]) -> Vec<Tuple> {
    edges
        .iter()
        .flat_map(|&(u, v)| [Tuple::edge(u, v), Tuple::edge(v, u)])
        .collect()
}

/// Sequential union-find oracle: the sorted set of per-component
/// minimum vertex identifiers.
pub fn reference_seeds(edges: &[(u32, u32)]) -> Vec<u32> {
    fn find(parent: &mut HashMap<u32, u32>, mut x: u32) -> u32 {
        loop {
            let p = *parent.get(&x).unwrap_or(&x);
            if p == x {
                return x;
            }
            let gp = *parent.get(&p).unwrap_or(&p);
            parent.insert(x, gp);
            x = gp;
        }
    }

    let mut parent: HashMap<u32, u32> = HashMap::new();
    for &(u, v) in edges {
        let ru = find(&mut parent, u);
        let rv = find(&mut parent, v);
        if ru != rv {
            parent.insert(ru.max(rv), ru.min(rv));
        }
    }
    let mut seeds: Vec<u32> = edges
        .iter()
        .flat_map(|&(u, v)| [u, v])
        .collect::<std::collections::BTreeSet<u32>>()
        .into_iter()
        .filter_map(|v| {
            let root = find(&mut parent, v);
            (root == v).then_some(v)
        })
        .collect();
    seeds.sort_unstable();
    seeds
}

/// Full pipeline on one communicator. Returns (seeds, iterations); the
/// seed list is only populated on rank 0.
pub fn run_pipeline<C: Communicator>(
    comm: &C,
    method: Method,
    tuples: Vec<Tuple>,
) -> (Vec<u32>, usize) {
    let result = cluster(comm, method, tuples).expect("cluster");
    let iterations = result.iterations;
    let seeds = extract_seeds(comm, result.tuples).expect("extract_seeds");
    (seeds, iterations)
}

/// Split a tuple stream into `p` contiguous, non-empty shares.
pub fn chunk_evenly(tuples: &[Tuple], p: usize) -> Vec<Vec<Tuple>> {
    let n = tuples.len();
    assert!(n >= p, "need at least one tuple per rank");
    (0..p)
        .map(|r| tuples[r * n / p..(r + 1) * n / p].to_vec())
        .collect()
}

/// Run the pipeline over `p` in-process ranks and return rank 0's
/// sorted seed list plus the iteration count.
pub fn run_on_ranks(p: usize, method: Method, edges: &[(u32, u32)]) -> (Vec<u32>, usize) {
    let tuples = tuples_from_edges(edges);
    if p == 1 {
        let (mut seeds, iterations) = run_pipeline(&NoComm, method, tuples);
        seeds.sort_unstable();
        return (seeds, iterations);
    }
    let chunks = chunk_evenly(&tuples, p);
    let comms = ThreadComm::split_world(p);
    let handles: Vec<_> = comms
        .into_iter()
        .zip(chunks)
        .map(|(comm, share)| thread::spawn(move || run_pipeline(&comm, method, share)))
        .collect();
    let results: Vec<(Vec<u32>, usize)> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();
    let iterations = results[0].1;
    assert!(
        results.iter().all(|(_, i)| *i == iterations),
        "ranks disagree on the iteration count"
    );
    let mut seeds = results[0].0.clone();
    seeds.sort_unstable();
    (seeds, iterations)
}
