//! `memrate --list-metrics`: print the catalog in mask order.

use memrate_core::{CATALOG, MetricDefinition};

fn format_row(index: usize, def: &MetricDefinition) -> String {
    format!(
        "{:>3}  {:<20} {:<30} {:<18} {}",
        index + 1,
        def.name,
        def.external_id,
        def.source_key,
        def.kind
    )
}

/// Print every catalog entry, one per line, with its mask position.
pub fn run() {
    println!(
        "{:>3}  {:<20} {:<30} {:<18} {}",
        "#", "name", "external id", "stats key", "kind"
    );
    for (i, def) in CATALOG.iter().enumerate() {
        println!("{}", format_row(i, def));
    }
}
