//! TimberKV Gauntlet
//!
//! Load test: many concurrent clients issuing random reads of known keys,
//! repeated for several iterations, with per-runner throughput statistics.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use parking_lot::Mutex;
use rand::Rng;
use timberkv::client::Client;
use timberkv::wal::{LogReader, Operation};
use tracing_subscriber::{fmt, EnvFilter};

/// TimberKV Gauntlet
#[derive(Parser, Debug)]
#[command(name = "timberkv-gauntlet")]
#[command(about = "Concurrent read load test against a TimberKV server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Log or seed file to take keys from
    #[arg(short, long, default_value = "seed-log.txt")]
    keys_from: PathBuf,

    /// Concurrent client counts to try, e.g. `-c 5 -c 50`
    #[arg(short, long, default_values_t = vec![5])]
    clients: Vec<usize>,

    /// Trials per client count
    #[arg(short, long, default_value = "3")]
    iterations: usize,

    /// Reads per client per trial
    #[arg(short, long, default_value = "10000")]
    requests: usize,

    /// Pause between reads, in milliseconds
    #[arg(short, long, default_value = "20")]
    delay_ms: u64,
}

/// Running min/mean/max over per-runner throughput
#[derive(Debug, Default, Clone)]
struct Summary {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Summary {
    fn accept(&mut self, sample: f64) {
        if self.count == 0 {
            self.min = sample;
            self.max = sample;
        } else {
            self.min = self.min.min(sample);
            self.max = self.max.max(sample);
        }
        self.count += 1;
        self.sum += sample;
    }

    fn combine(&mut self, other: &Summary) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,timberkv_gauntlet=debug"));
    fmt().with_env_filter(filter).with_thread_ids(true).init();

    let args = Args::parse();

    let keys = match load_keys(&args.keys_from) {
        Ok(keys) if !keys.is_empty() => keys,
        Ok(_) => {
            tracing::error!("No keys found in {}", args.keys_from.display());
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Failed to read keys from {}: {}", args.keys_from.display(), e);
            std::process::exit(1);
        }
    };
    tracing::info!("Running the gauntlet with {} keys", keys.len());

    for &count in &args.clients {
        let mut overall = Summary::default();
        for iteration in 1..=args.iterations {
            tracing::debug!("Client count {} - iteration {}", count, iteration);
            let trial = conduct_trial(&args, count, &keys);
            tracing::debug!(
                "Trial: {} runners, mean {:.1} req/s (min {:.1}, max {:.1})",
                trial.count,
                trial.mean(),
                trial.min,
                trial.max
            );
            overall.combine(&trial);
        }
        tracing::info!(
            "{} clients: mean {:.1} req/s per runner (min {:.1}, max {:.1}) over {} runs",
            count,
            overall.mean(),
            overall.min,
            overall.max,
            overall.count
        );
    }
}

/// Keys that are live at the end of the log
fn load_keys(path: &Path) -> timberkv::Result<Vec<String>> {
    let mut live = HashSet::new();
    for entry in LogReader::open(path)?.entries() {
        match entry?.operation {
            Operation::Insert { key, .. } | Operation::Update { key, .. } => {
                live.insert(key);
            }
            Operation::Delete { key } => {
                live.remove(&key);
            }
        }
    }
    Ok(live.into_iter().collect())
}

fn conduct_trial(args: &Args, count: usize, keys: &[String]) -> Summary {
    let results = Mutex::new(Summary::default());

    let scoped = crossbeam::thread::scope(|scope| {
        for id in 0..count {
            let results = &results;
            scope.spawn(move |_| match run_client(id, args, keys) {
                Ok(throughput) => results.lock().accept(throughput),
                Err(e) => tracing::error!("Runner {} failed: {}", id, e),
            });
        }
    });
    if scoped.is_err() {
        tracing::error!("A runner panicked");
    }

    results.into_inner()
}

/// Returns reads per second achieved by this runner
fn run_client(id: usize, args: &Args, keys: &[String]) -> timberkv::Result<f64> {
    let mut client = Client::connect(&args.server)?;
    let mut rng = rand::rng();
    let delay = Duration::from_millis(args.delay_ms);
    let start = Instant::now();

    for _ in 0..args.requests {
        let key = &keys[rng.random_range(0..keys.len())];
        let response = client.read(key)?;
        tracing::trace!("Runner {} - server said: {}", id, response);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);
    tracing::debug!("Runner {} finished in {:.2}s", id, elapsed);
    Ok(args.requests as f64 / elapsed)
}
