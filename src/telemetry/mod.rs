//! Telemetry ingestion: the sample interchange shape, GPS lock filtering, and
//! the canonical ordered timeseries store.

/// GPS lock classification and position-scrubbing transforms.
pub mod lock;
/// The decoded sample interchange shape.
pub mod sample;
/// Ordered, deduplicated sample store with interpolating queries.
pub mod timeseries;
