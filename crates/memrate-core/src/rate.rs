//! Rate engine: turns a raw sample plus the previous snapshot into records.
//!
//! Counters become per-second rates computed against the previous entry with
//! the same external id. Gauges pass through unchanged. Entries are correlated
//! by external id only, never by position, since the enabled metric set can
//! change between runs.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::catalog::{MetricKind, find_by_external_id};
use crate::sample::{RawSample, SampleEntry};
use crate::timestamp::Timestamp;

/// Decimal places kept on computed rates.
pub const RATE_DECIMALS: i32 = 2;

/// Emitted value of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Per-second rate of a counter, rounded to [`RATE_DECIMALS`].
    Rate(f64),
    /// Counter with no previous entry to compare against.
    NoBaseline,
    /// Gauge value as captured.
    Gauge(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Rate(v) | Self::Gauge(v) => v,
            Self::NoBaseline => 0.0,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate(v) => write!(f, "{v:.2}"),
            Self::NoBaseline => f.write_str("0"),
            Self::Gauge(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Final per-metric output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub external_id: String,
    pub timestamp: Timestamp,
    pub value: MetricValue,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Per-second rate between two entries of the same counter.
///
/// A decrease means the server restarted; the current value is then taken
/// as the rate. A non-positive elapsed time yields 0. The result is never
/// negative.
pub fn compute_rate(previous: &SampleEntry, current: &SampleEntry) -> f64 {
    if current.value < previous.value {
        log::debug!(
            "counter reset on {}: {} -> {}",
            current.external_id,
            previous.value,
            current.value
        );
        return round_to(current.value.max(0.0), RATE_DECIMALS);
    }

    let elapsed = current.timestamp.seconds_since(previous.timestamp);
    if elapsed <= 0.0 {
        log::debug!(
            "non-positive elapsed time ({elapsed}s) for {}, emitting 0",
            current.external_id
        );
        return 0.0;
    }

    let rate = round_to((current.value - previous.value) / elapsed, RATE_DECIMALS);
    if rate.is_finite() { rate } else { 0.0 }
}

fn kind_of(entry: &SampleEntry) -> MetricKind {
    find_by_external_id(&entry.external_id).map_or(MetricKind::Gauge, |def| def.kind)
}

/// Compute one record per entry of `current`, in the same order.
pub fn reconcile(previous: Option<&RawSample>, current: &RawSample) -> Vec<RateRecord> {
    current
        .entries
        .iter()
        .map(|entry| {
            let value = match kind_of(entry) {
                MetricKind::Gauge => MetricValue::Gauge(entry.value),
                MetricKind::Counter => match previous.and_then(|p| p.find(&entry.external_id)) {
                    Some(prev) => MetricValue::Rate(compute_rate(prev, entry)),
                    None => MetricValue::NoBaseline,
                },
            };
            RateRecord {
                external_id: entry.external_id.clone(),
                timestamp: entry.timestamp,
                value,
            }
        })
        .collect()
}
