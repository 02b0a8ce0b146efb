//! CLI for memrate: one memcached stats collection per invocation.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;
use memrate_core::config::DEFAULT_TIMEOUT_SECS;
use memrate_core::error::{EXIT_OK, EXIT_USAGE};

#[derive(Parser, Debug)]
#[command(name = "memrate")]
#[command(about = "memrate: per-second rates from a memcached stats response")]
#[command(version = memrate_core::VERSION)]
#[command(
    after_help = "Example:\n  memrate \"1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1\" 10.10.2.5 11211"
)]
struct Cli {
    /// <METRIC_STATE> <HOST> <PORT>: comma-separated 1/0 flags in catalog
    /// order, target host, target port (empty = 11211)
    #[arg(value_name = "PARAMS")]
    params: Vec<String>,

    /// Directory holding per-target snapshot files
    #[arg(long, env = "MEMRATE_SNAPSHOT_DIR")]
    snapshot_dir: Option<PathBuf>,

    /// Bound on connect, request and response, in seconds
    #[arg(long, env = "MEMRATE_TIMEOUT_SEC", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_sec: f64,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Print the metric catalog in mask order and exit
    #[arg(long)]
    list_metrics: bool,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(EXIT_USAGE);
            }
        },
    };

    if cli.list_metrics {
        commands::metrics::run();
        std::process::exit(EXIT_OK);
    }

    let result = commands::collect::run(commands::collect::CollectCommandConfig {
        params: &cli.params,
        snapshot_dir: cli.snapshot_dir.as_deref(),
        timeout_sec: cli.timeout_sec,
        format: &cli.format,
    });

    match result {
        Ok(()) => std::process::exit(EXIT_OK),
        Err(e) => {
            log::debug!("run failed: {e:?}");
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}
