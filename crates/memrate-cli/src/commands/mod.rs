pub mod collect;
pub mod metrics;
