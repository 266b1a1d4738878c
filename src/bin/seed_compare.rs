//! Compare two seed files modulo line ordering.
//!
//! Prints each file's partition count, then SUCCESS/FAILURE depending on
//! whether the two label multisets match. Exit status 0 iff they do.

use std::fs;
use std::path::Path;
use std::process;

use anyhow::Context;

fn read_seeds(path: &Path) -> anyhow::Result<Vec<u64>> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let mut seeds = Vec::new();
    for (lineno, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let seed: u64 = line
            .parse()
            .with_context(|| format!("{}:{}: not a label", path.display(), lineno + 1))?;
        seeds.push(seed);
    }
    seeds.sort_unstable();
    Ok(seeds)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: seed_compare <seedfile1> <seedfile2>");
        eprintln!("matches the partitioning output of two runs");
        process::exit(1);
    }

    let run = || -> anyhow::Result<bool> {
        let a = read_seeds(Path::new(&args[1]))?;
        let b = read_seeds(Path::new(&args[2]))?;
        println!("{} has {} partitions", args[1], a.len());
        println!("{} has {} partitions", args[2], b.len());
        Ok(a == b)
    };

    match run() {
        Ok(true) => println!("SUCCESS: seed sets match"),
        Ok(false) => {
            println!("FAILURE: seed sets differ");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    }
}
