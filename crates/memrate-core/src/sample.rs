//! Raw samples: one capture of the enabled metrics before rate conversion.

use serde::{Deserialize, Serialize};

use crate::catalog::{MetricDefinition, MetricSelection};
use crate::error::CollectorError;
use crate::stats::StatsMap;
use crate::timestamp::Timestamp;

/// One metric's value at capture time, transform already applied.
///
/// This is also the on-disk snapshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleEntry {
    pub variable_name: String,
    pub external_id: String,
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Ordered entries of one capture, in catalog order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSample {
    pub entries: Vec<SampleEntry>,
}

impl RawSample {
    pub fn new(entries: Vec<SampleEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry with the given external id, if present.
    pub fn find(&self, external_id: &str) -> Option<&SampleEntry> {
        self.entries.iter().find(|e| e.external_id == external_id)
    }

    /// Build a sample for the selected metrics from a parsed stats response.
    ///
    /// Every enabled metric must be present with a finite, non-negative
    /// numeric value.
    /// All offenders are reported together rather than the first one only.
    pub fn capture(
        stats: &StatsMap,
        selection: &MetricSelection,
        timestamp: Timestamp,
    ) -> Result<Self, CollectorError> {
        let mut entries = Vec::with_capacity(selection.enabled_count());
        let mut missing = Vec::new();

        for def in selection.enabled() {
            match read_value(stats, def) {
                Some(value) => entries.push(SampleEntry {
                    variable_name: def.name.to_string(),
                    external_id: def.external_id.to_string(),
                    timestamp,
                    value,
                }),
                None => missing.push(def.name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(CollectorError::MetricNotFound { metrics: missing });
        }
        Ok(Self { entries })
    }
}

fn read_value(stats: &StatsMap, def: &MetricDefinition) -> Option<f64> {
    let raw = stats.get(def.source_key)?;
    let parsed: f64 = raw.trim().parse().ok()?;
    if !parsed.is_finite() || parsed < 0.0 {
        log::debug!("{} has unusable value {raw:?}", def.source_key);
        return None;
    }
    Some(def.transform.apply(parsed))
}
