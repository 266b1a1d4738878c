//! End-to-end single-rank scenarios: known graphs, known seed sets,
//! all three engine variants.

mod common;

use common::{run_on_ranks, METHODS};

#[test]
fn single_edge() {
    for method in METHODS {
        let (seeds, _) = run_on_ranks(1, method, &[(1, 2)]);
        assert_eq!(seeds, vec![1], "{method}");
    }
}

#[test]
fn two_components() {
    for method in METHODS {
        let (seeds, _) = run_on_ranks(1, method, &[(1, 2), (2, 3), (10, 11)]);
        assert_eq!(seeds, vec![1, 10], "{method}");
    }
}

#[test]
fn chain_of_eight_converges_logarithmically() {
    let edges = [(1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 7), (7, 8)];
    for method in METHODS {
        let (seeds, iterations) = run_on_ranks(1, method, &edges);
        assert_eq!(seeds, vec![1], "{method}");
        assert!(
            iterations <= 9,
            "{method}: chain of 8 took {iterations} super-steps"
        );
    }
}

#[test]
fn star_converges_fast() {
    let edges = [(5, 1), (5, 2), (5, 3), (5, 4), (5, 6), (5, 7)];
    for method in METHODS {
        let (seeds, iterations) = run_on_ranks(1, method, &edges);
        assert_eq!(seeds, vec![1], "{method}");
        assert!(
            iterations <= 5,
            "{method}: star took {iterations} super-steps"
        );
    }
}

#[test]
fn two_cycles_sharing_a_vertex_merge() {
    let edges = [(1, 2), (2, 3), (3, 1), (3, 4), (4, 5), (5, 3)];
    for method in METHODS {
        let (seeds, _) = run_on_ranks(1, method, &edges);
        assert_eq!(seeds, vec![1], "{method}");
    }
}

#[test]
fn duplicated_edges_terminate() {
    for method in METHODS {
        let (seeds, iterations) = run_on_ranks(1, method, &[(1, 2), (1, 2), (1, 2)]);
        assert_eq!(seeds, vec![1], "{method}");
        assert!(
            iterations <= 4,
            "{method}: duplicate edges took {iterations} super-steps"
        );
    }
}

#[test]
fn self_loop_is_its_own_component() {
    for method in METHODS {
        let (seeds, _) = run_on_ranks(1, method, &[(4, 4), (1, 2)]);
        assert_eq!(seeds, vec![1, 4], "{method}");
    }
}

#[test]
fn runs_are_deterministic() {
    let edges = [(1, 2), (2, 3), (3, 4), (9, 12), (12, 15), (20, 21)];
    for method in METHODS {
        let a = run_on_ranks(1, method, &edges);
        let b = run_on_ranks(1, method, &edges);
        assert_eq!(a, b, "{method}");
    }
}
