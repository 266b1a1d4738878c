//! Benchmark front-end: generate an R-MAT graph, run one engine variant
//! to convergence, write the seed file from rank 0.
//!
//! Ranks are threads of this process sharing the in-process mailbox;
//! `--ranks 1` runs the serial degenerate case.

use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use logcc::cluster::{cluster, extract_seeds, write_seed_file, Method};
use logcc::comm::{Communicator, NoComm, ThreadComm};
use logcc::gen::rmat;

/// Parallel connected-components benchmark over synthetic R-MAT graphs.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// log2 of the vertex count
    #[arg(long)]
    scale: u32,

    /// average number of edges per vertex
    #[arg(long)]
    edgefactor: u64,

    /// engine variant: standard, inactive or loadbalance
    #[arg(long)]
    method: String,

    /// base path of the seed file; the method name is appended
    #[arg(long)]
    seedfile: PathBuf,

    /// number of in-process ranks
    #[arg(long, default_value_t = 1)]
    ranks: usize,
}

fn run_rank<C: Communicator>(comm: &C, args: &Args, method: Method) -> anyhow::Result<()> {
    let rank = comm.rank();
    if rank == 0 {
        println!("running with {} ranks", comm.size());
        println!("scale: {}", args.scale);
        println!("edgefactor: {}", args.edgefactor);
    }

    let tuples = rmat::generate(comm, args.scale, args.edgefactor);
    let start = Instant::now();
    let result = cluster(comm, method, tuples)?;
    let seeds = extract_seeds(comm, result.tuples)?;
    let elapsed = start.elapsed();

    if rank == 0 {
        println!(
            "{} converged after {} super-steps in {:.3?}",
            method, result.iterations, elapsed
        );
        let written = write_seed_file(&args.seedfile, method, &seeds)?;
        println!(
            "partition count = {}. seeds written to {}",
            seeds.len(),
            written.display()
        );
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprint!("{e}");
            process::exit(1);
        }
    };
    let method = match Method::from_str(&args.method) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    if args.ranks == 0 {
        eprintln!("--ranks must be at least 1");
        process::exit(1);
    }

    let outcome = if args.ranks == 1 {
        run_rank(&NoComm, &args, method)
    } else {
        let comms = ThreadComm::split_world(args.ranks);
        let workers: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let args = args.clone();
                thread::spawn(move || run_rank(&comm, &args, method))
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().expect("rank thread panicked"))
            .collect::<anyhow::Result<Vec<()>>>()
            .map(|_| ())
    };

    if let Err(e) = outcome.context("engine run failed") {
        eprintln!("{e:#}");
        process::exit(1);
    }
}
