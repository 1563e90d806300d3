//! Batch driver for the openlive engine.
//!
//! Loads a `LiveDefinition` from JSON, fans N runs out across worker threads
//! (each with its own engine clone), and prints score statistics. Every run
//! is addressed by `(run_id, seed)` alone, so the statistics are identical no
//! matter how the batch is sharded or scheduled.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;

use ol_core::{Live, LiveDefinition};

#[derive(Parser)]
#[command(name = "ol_cli")]
#[command(about = "Run live score simulations over a definition file", long_about = None)]
struct Cli {
    /// Definition JSON file; "-" or absent reads stdin.
    definition: Option<PathBuf>,

    /// Number of runs to simulate.
    #[arg(long, default_value_t = 100_000)]
    iters: u64,

    /// Base RNG seed; drawn randomly when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// First run id, for resuming or sharding batches.
    #[arg(long, default_value_t = 0)]
    skip: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    if cli.iters == 0 {
        bail!("--iters must be positive");
    }

    let json = match &cli.definition {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("cannot read stdin")?;
            buf
        }
    };
    let definition: LiveDefinition =
        serde_json::from_str(&json).context("invalid definition JSON")?;
    let live = Live::new(&definition).context("invalid live definition")?;

    let seed = cli.seed.unwrap_or_else(rand::random);
    log::info!("simulating {} runs from id {} with seed {:#018x}", cli.iters, cli.skip, seed);

    let start = Instant::now();
    let mut results: Vec<i64> = (0..cli.iters)
        .into_par_iter()
        .map_init(|| live.clone(), |live, i| live.simulate(cli.skip + i, seed))
        .collect();
    log::info!("simulated {} runs in {:.3}s", results.len(), start.elapsed().as_secs_f64());

    let summary = Summary::from_results(&mut results);
    print!("{}", summary);
    Ok(())
}

struct Summary {
    avg: f64,
    sd: f64,
    min: i64,
    max: i64,
    /// Score at the 0.1% upper tail, for batches of at least 10k runs.
    top_permille: Option<i64>,
}

impl Summary {
    fn from_results(results: &mut [i64]) -> Self {
        let n = results.len();
        let avg = results.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
        let sd = if n > 1 {
            (results
                .iter()
                .map(|&x| {
                    let d = x as f64 - avg;
                    d * d
                })
                .sum::<f64>()
                / (n - 1) as f64)
                .sqrt()
        } else {
            0.0
        };
        let min = results.iter().min().copied().unwrap_or(0);
        let max = results.iter().max().copied().unwrap_or(0);
        let top_permille = if n >= 10_000 {
            let nth = n - n / 1000;
            let (_, value, _) = results.select_nth_unstable(nth);
            Some(*value)
        } else {
            None
        };
        Self { avg, sd, min, max, top_permille }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Avg\t{:.0}", self.avg)?;
        writeln!(f, "SD\t{:.0}", self.sd)?;
        writeln!(f, "Min\t{}", self.min)?;
        writeln!(f, "Max\t{}", self.max)?;
        if let Some(top) = self.top_permille {
            writeln!(f, "0.1%\t{}", top)?;
        }
        Ok(())
    }
}
