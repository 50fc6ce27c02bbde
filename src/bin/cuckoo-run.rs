//! Runs the insert-then-lookup pass once and prints the filter and stats.

use clap::Parser;
use cuckoo_rs::harness::{self, HarnessConfig, DEFAULT_CAPACITY};
use cuckoo_rs::keys::INIT_KEY;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cuckoo-run")]
#[command(about = "Fill a cuckoo filter from a generated key sequence and look every key up")]
struct Args {
    /// Bucket count (power of two)
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Keys to insert; defaults to 75% of capacity
    #[arg(long)]
    keys: Option<usize>,

    /// Key generator seed
    #[arg(long, default_value_t = INIT_KEY)]
    init_key: u16,

    /// Seed for eviction choices
    #[arg(long)]
    seed: Option<u64>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = HarnessConfig::for_capacity(args.capacity);
    if let Some(keys) = args.keys {
        config.num_keys = keys;
    }
    config.init_key = args.init_key;
    config.seed = args.seed;

    match harness::run(&config) {
        Ok(report) => {
            println!("{}", report.snapshot);
            println!("{}", report.stats);
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}
