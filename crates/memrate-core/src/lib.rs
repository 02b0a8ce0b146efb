//! # memrate-core
//!
//! **Per-second rates from a memcached `stats` response.**
//!
//! One collection run asks a server for its statistics, keeps the metrics
//! enabled for this invocation, and converts cumulative counters into rates
//! against the sample persisted by the previous run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use memrate_core::{CollectionRequest, Collector, CollectorConfig, MetricSelection, Target};
//!
//! let config = CollectorConfig::default();
//! let collector = Collector::from_config(&config);
//! let request = CollectionRequest {
//!     target: Target::parse("127.0.0.1", "", config.default_port).unwrap(),
//!     selection: MetricSelection::all(),
//! };
//! let report = collector.collect(&request).unwrap();
//! for record in &report.records {
//!     println!("{}", memrate_core::format_line(record));
//! }
//! ```
//!
//! ## Architecture
//!
//! Catalog + Stats → RawSample → Rate engine (with previous snapshot) → Records
//!
//! - Counters emit `(current - previous) / elapsed`, rounded to two decimals.
//!   A decrease is a restart and emits the current value. No previous entry
//!   emits `0`.
//! - Gauges emit the current value.
//! - The snapshot saved after a run is the raw sample, never the rates.

pub mod catalog;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod output;
pub mod rate;
pub mod sample;
pub mod snapshot;
pub mod stats;
pub mod timestamp;

pub use catalog::{CATALOG, MetricDefinition, MetricKind, MetricSelection, Transform};
pub use client::{StatsSource, TcpStatsClient};
pub use collector::{CollectionReport, CollectionRequest, Collector};
pub use config::{CollectorConfig, DEFAULT_PORT, Target};
pub use error::CollectorError;
pub use output::{OutputFormat, format_line, write_records};
pub use rate::{MetricValue, RateRecord, compute_rate, reconcile};
pub use sample::{RawSample, SampleEntry};
pub use snapshot::SnapshotStore;
pub use stats::{StatsBuffer, StatsMap, parse_stats};
pub use timestamp::Timestamp;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
