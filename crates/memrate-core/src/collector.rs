//! One collection run: fetch, sample, rate, persist.

use std::path::PathBuf;

use crate::catalog::MetricSelection;
use crate::client::{StatsSource, TcpStatsClient};
use crate::config::{CollectorConfig, Target};
use crate::error::CollectorError;
use crate::rate::{RateRecord, reconcile};
use crate::sample::RawSample;
use crate::snapshot::SnapshotStore;
use crate::timestamp::Timestamp;

/// What to collect and from where.
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    pub target: Target,
    pub selection: MetricSelection,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub records: Vec<RateRecord>,
    /// No usable snapshot existed before this run.
    pub cold_start: bool,
    pub snapshot_path: PathBuf,
}

/// Drives a run against a stats source and a snapshot store.
pub struct Collector<S> {
    source: S,
    store: SnapshotStore,
}

impl Collector<TcpStatsClient> {
    /// TCP collector configured from `config`.
    pub fn from_config(config: &CollectorConfig) -> Self {
        Self::new(
            TcpStatsClient::new(config.timeout),
            SnapshotStore::new(&config.snapshot_dir),
        )
    }
}

impl<S: StatsSource> Collector<S> {
    pub fn new(source: S, store: SnapshotStore) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run once, stamping the sample with the time the response arrived.
    pub fn collect(
        &self,
        request: &CollectionRequest,
    ) -> Result<CollectionReport, CollectorError> {
        self.run(request, Timestamp::now)
    }

    /// Run once with an explicit capture timestamp.
    pub fn collect_at(
        &self,
        request: &CollectionRequest,
        captured_at: Timestamp,
    ) -> Result<CollectionReport, CollectorError> {
        self.run(request, || captured_at)
    }

    fn run(
        &self,
        request: &CollectionRequest,
        clock: impl FnOnce() -> Timestamp,
    ) -> Result<CollectionReport, CollectorError> {
        let target = &request.target;
        let stats = self.source.fetch_stats(target)?;
        let captured_at = clock();
        log::debug!("{} stats keys from {target} at {captured_at}", stats.len());

        // Fails before the snapshot is touched, so the old baseline survives.
        let current = RawSample::capture(&stats, &request.selection, captured_at)?;

        let previous = self.store.load(&target.host, target.port);
        let cold_start = previous.is_none();
        if cold_start {
            log::info!("no baseline for {target}; counters start at 0");
        }
        let records = reconcile(previous.as_ref(), &current);

        let snapshot_path = self.store.save(&target.host, target.port, &current)?;

        Ok(CollectionReport {
            records,
            cold_start,
            snapshot_path,
        })
    }
}
