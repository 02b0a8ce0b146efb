//! `memrate <METRIC_STATE> <HOST> <PORT>`: one collection run.

use std::path::Path;

use memrate_core::config::{CollectorConfig, Target, timeout_from_secs};
use memrate_core::{CollectionRequest, Collector, CollectorError, MetricSelection, OutputFormat};

/// Number of positional parameters in the invocation contract.
pub const EXPECTED_PARAMS: usize = 3;

pub struct CollectCommandConfig<'a> {
    pub params: &'a [String],
    pub snapshot_dir: Option<&'a Path>,
    pub timeout_sec: f64,
    pub format: &'a str,
}

/// Turn the positional parameters into a collection request.
pub fn parse_params(
    params: &[String],
    default_port: u16,
) -> Result<CollectionRequest, CollectorError> {
    let [mask, host, port] = params else {
        return Err(CollectorError::WrongParameterCount {
            expected: EXPECTED_PARAMS,
            found: params.len(),
        });
    };
    Ok(CollectionRequest {
        selection: MetricSelection::parse(mask)?,
        target: Target::parse(host, port, default_port)?,
    })
}

fn build_config(cfg: &CollectCommandConfig<'_>) -> Result<CollectorConfig, CollectorError> {
    let mut config = CollectorConfig {
        timeout: timeout_from_secs(cfg.timeout_sec)?,
        ..Default::default()
    };
    if let Some(dir) = cfg.snapshot_dir {
        config.snapshot_dir = dir.to_path_buf();
    }
    Ok(config)
}

/// Run the collect command, writing records to stdout.
pub fn run(cfg: CollectCommandConfig<'_>) -> Result<(), CollectorError> {
    let config = build_config(&cfg)?;
    let request = parse_params(cfg.params, config.default_port)?;
    let format: OutputFormat = cfg.format.parse().map_err(CollectorError::Other)?;

    log::debug!(
        "collecting {} metrics from {} (snapshots in {})",
        request.selection.enabled_count(),
        request.target,
        config.snapshot_dir.display()
    );

    let report = Collector::from_config(&config).collect(&request)?;
    if report.cold_start {
        log::info!(
            "first run for {}; baseline saved to {}",
            request.target,
            report.snapshot_path.display()
        );
    }

    let stdout = std::io::stdout();
    memrate_core::write_records(&mut stdout.lock(), &report.records, format)
        .map_err(|e| CollectorError::Other(format!("Failed to write output: {e}")))
}
