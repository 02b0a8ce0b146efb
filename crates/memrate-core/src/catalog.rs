//! Static metric catalog and per-invocation metric selection.
//!
//! The catalog is a compile-time table. Its order is part of the invocation
//! contract: the metric-state mask carries one flag per entry, in this order.

use crate::error::CollectorError;

/// Bytes per mebibyte, used by the byte-valued metrics.
pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Counter (rate) or gauge (absolute) classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonic since server start; emitted as a per-second rate.
    Counter,
    /// Instantaneous value; emitted as-is.
    Gauge,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Gauge => write!(f, "gauge"),
        }
    }
}

/// Numeric transform applied to a raw stats value before it enters a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    None,
    DivideBy(f64),
}

impl Transform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::DivideBy(factor) => value / factor,
        }
    }
}

/// One collectible metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDefinition {
    /// Unique catalog key, also stored as `variableName` in snapshots.
    pub name: &'static str,
    /// Stable identifier consumed by the monitoring pipeline.
    pub external_id: &'static str,
    /// Key in the `stats` response.
    pub source_key: &'static str,
    pub kind: MetricKind,
    pub transform: Transform,
}

impl MetricDefinition {
    const fn gauge(
        name: &'static str,
        external_id: &'static str,
        source_key: &'static str,
    ) -> Self {
        Self {
            name,
            external_id,
            source_key,
            kind: MetricKind::Gauge,
            transform: Transform::None,
        }
    }

    const fn counter(
        name: &'static str,
        external_id: &'static str,
        source_key: &'static str,
    ) -> Self {
        Self {
            name,
            external_id,
            source_key,
            kind: MetricKind::Counter,
            transform: Transform::None,
        }
    }

    const fn in_mib(mut self) -> Self {
        self.transform = Transform::DivideBy(BYTES_PER_MIB);
        self
    }

    pub fn is_rate(&self) -> bool {
        self.kind == MetricKind::Counter
    }
}

/// Every metric this collector knows, in mask order.
///
/// External ids are kept byte-for-byte (including the `Currrent` spelling)
/// since downstream dashboards key on them.
pub const CATALOG: &[MetricDefinition] = &[
    MetricDefinition::gauge("Threads", "1534:Threads:4", "threads"),
    MetricDefinition::gauge("CurrentItems", "1535:Current Items:4", "curr_items"),
    MetricDefinition::gauge("TotalItems", "1536:Total Items:4", "total_items"),
    MetricDefinition::gauge("StoreLimit", "1537:Store Limit:4", "limit_maxbytes").in_mib(),
    MetricDefinition::gauge("StoreUsage", "1538:Store Usage:4", "bytes").in_mib(),
    MetricDefinition::gauge(
        "CurrentConnections",
        "1541:Currrent Connections:4",
        "curr_connections",
    ),
    MetricDefinition::counter("BytesRead/Sec", "1539:Bytes Read/Sec:4", "bytes_read").in_mib(),
    MetricDefinition::counter(
        "BytesWritten/Sec",
        "1540:Bytes Written/Sec:4",
        "bytes_written",
    )
    .in_mib(),
    MetricDefinition::counter(
        "Connections/Sec",
        "1542:Connections/Sec:4",
        "total_connections",
    ),
    MetricDefinition::counter("Gets/Sec", "1543:Gets/Sec:4", "cmd_get"),
    MetricDefinition::counter("Sets/Sec", "1544:Sets/Sec:4", "cmd_set"),
    MetricDefinition::counter("GetHits/Sec", "1545:Get Hits/Sec:4", "get_hits"),
    MetricDefinition::counter("GetMisses/Sec", "1546:Get Misses/Sec:4", "get_misses"),
    MetricDefinition::counter("DeleteHits/Sec", "1547:Delete Hits/Sec:4", "delete_hits"),
    MetricDefinition::counter(
        "DeleteMisses/Sec",
        "1548:Delete Misses/Sec:4",
        "delete_misses",
    ),
    MetricDefinition::counter("IncrHits/Sec", "1549:Incr Hits/Sec:4", "incr_hits"),
    MetricDefinition::counter("IncrMisses/Sec", "1550:Incr Misses/Sec:4", "incr_misses"),
    MetricDefinition::counter("DecrHits/Sec", "1551:Decr Hits/Sec:4", "decr_hits"),
    MetricDefinition::counter("DecrMisses/Sec", "1552:Decr Misses/Sec:4", "decr_misses"),
    MetricDefinition::counter("Evictions/Sec", "1553:Evictions/Sec:4", "evictions"),
    MetricDefinition::counter("Reclaimed/Sec", "1554:Reclaimed/Sec:4", "reclaimed"),
];

/// Look up a catalog entry by external id.
pub fn find_by_external_id(external_id: &str) -> Option<&'static MetricDefinition> {
    CATALOG.iter().find(|m| m.external_id == external_id)
}

/// Which catalog entries are enabled for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelection {
    flags: Vec<bool>,
}

impl MetricSelection {
    /// Enable every catalog entry.
    pub fn all() -> Self {
        Self {
            flags: vec![true; CATALOG.len()],
        }
    }

    /// Parse a comma-separated `1`/`0` mask, one flag per catalog entry.
    pub fn parse(mask: &str) -> Result<Self, CollectorError> {
        let mask = mask.trim().trim_matches('"');
        let mut flags = Vec::with_capacity(CATALOG.len());
        for (i, token) in mask.split(',').enumerate() {
            match token.trim() {
                "1" => flags.push(true),
                "0" => flags.push(false),
                other => {
                    return Err(CollectorError::InvalidMetricState {
                        reason: format!("flag {} is '{other}', expected '1' or '0'", i + 1),
                    });
                }
            }
        }
        Self::from_flags(flags)
    }

    /// Build a selection from explicit flags; the length must match the catalog.
    pub fn from_flags(flags: Vec<bool>) -> Result<Self, CollectorError> {
        if flags.len() != CATALOG.len() {
            return Err(CollectorError::InvalidMetricState {
                reason: format!(
                    "{} flags given, catalog has {} metrics",
                    flags.len(),
                    CATALOG.len()
                ),
            });
        }
        Ok(Self { flags })
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    pub fn enabled_count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    /// Enabled catalog entries, in catalog order.
    pub fn enabled(&self) -> impl Iterator<Item = &'static MetricDefinition> + '_ {
        CATALOG
            .iter()
            .zip(&self.flags)
            .filter_map(|(def, on)| on.then_some(def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_and_ids_are_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|m| m.name).collect();
        let ids: HashSet<&str> = CATALOG.iter().map(|m| m.external_id).collect();
        assert_eq!(names.len(), CATALOG.len());
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn catalog_has_expected_shape() {
        assert_eq!(CATALOG.len(), 21);
        assert_eq!(CATALOG[0].external_id, "1534:Threads:4");
        assert_eq!(CATALOG[20].source_key, "reclaimed");
        let gauges = CATALOG.iter().filter(|m| !m.is_rate()).count();
        assert_eq!(gauges, 6);
    }

    #[test]
    fn byte_metrics_scale_to_mib() {
        let usage = CATALOG.iter().find(|m| m.name == "StoreUsage").unwrap();
        assert_eq!(usage.transform, Transform::DivideBy(BYTES_PER_MIB));
        assert!((usage.transform.apply(2.0 * BYTES_PER_MIB) - 2.0).abs() < 1e-12);
        let read = CATALOG.iter().find(|m| m.name == "BytesRead/Sec").unwrap();
        assert!(read.is_rate());
        assert_eq!(read.transform, Transform::DivideBy(BYTES_PER_MIB));
    }

    #[test]
    fn transform_none_is_identity() {
        assert_eq!(Transform::None.apply(42.5), 42.5);
    }

    #[test]
    fn find_by_external_id_hits_and_misses() {
        let m = find_by_external_id("1543:Gets/Sec:4").unwrap();
        assert_eq!(m.source_key, "cmd_get");
        assert!(find_by_external_id("9999:Nope:4").is_none());
    }

    #[test]
    fn parse_full_mask() {
        let mask = vec!["1"; CATALOG.len()].join(",");
        let sel = MetricSelection::parse(&mask).unwrap();
        assert_eq!(sel.enabled_count(), CATALOG.len());
        assert_eq!(sel, MetricSelection::all());
    }

    #[test]
    fn parse_mixed_mask_keeps_catalog_order() {
        let mut flags = vec!["0"; CATALOG.len()];
        flags[1] = "1";
        flags[9] = "1";
        let sel = MetricSelection::parse(&format!("\"{}\"", flags.join(","))).unwrap();
        let names: Vec<&str> = sel.enabled().map(|m| m.name).collect();
        assert_eq!(names, vec!["CurrentItems", "Gets/Sec"]);
        assert!(sel.is_enabled(9));
        assert!(!sel.is_enabled(0));
        assert!(!sel.is_enabled(500));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = MetricSelection::parse("1,1,1").unwrap_err();
        assert!(matches!(err, CollectorError::InvalidMetricState { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn parse_rejects_non_binary_flag() {
        let mut flags = vec!["1"; CATALOG.len()];
        flags[4] = "yes";
        let err = MetricSelection::parse(&flags.join(",")).unwrap_err();
        assert!(err.to_string().contains("flag 5"));
    }
}
