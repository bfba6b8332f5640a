//! TimberKV Seed Generator
//!
//! Writes a reconstruction log of random key/value pairs.

use std::path::PathBuf;

use clap::Parser;
use timberkv::seed::{self, SeedOptions, DEFAULT_SEED_COUNT};
use tracing_subscriber::{fmt, EnvFilter};

/// TimberKV Seed Generator
#[derive(Parser, Debug)]
#[command(name = "timberkv-seed")]
#[command(about = "Generate random key/value pairs as a reconstruction log")]
struct Args {
    /// Output file (replaced if it exists)
    #[arg(short, long, default_value = "seed-log.txt")]
    output: PathBuf,

    /// Number of pairs
    #[arg(short, long, default_value_t = DEFAULT_SEED_COUNT)]
    count: usize,

    /// Key length in characters
    #[arg(long, default_value = "12")]
    key_len: usize,

    /// Value length in characters
    #[arg(long, default_value = "16")]
    value_len: usize,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let options = SeedOptions {
        count: args.count,
        key_len: args.key_len,
        value_len: args.value_len,
    };

    match seed::generate(&args.output, &options) {
        Ok(report) => tracing::info!(
            "Wrote {} pairs ({} bytes) to {}",
            report.pairs_written,
            report.bytes_written,
            args.output.display()
        ),
        Err(e) => {
            tracing::error!("Seed generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
