//! Diagnostic events observed while building and rendering a timeline.
//!
//! These are warning/visibility conditions, never failures: an oversized
//! telemetry gap is interpolated through, a GPS lock transition just explains
//! why positions disappeared for a stretch.

use crate::foundation::core::Timestamp;
use crate::telemetry::lock::GpsLockState;

/// One diagnostic event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// Two adjacent samples are further apart than the configured threshold.
    GapTooLarge {
        /// Timestamp of the sample before the gap.
        from: Timestamp,
        /// Timestamp of the sample after the gap.
        to: Timestamp,
        /// Gap width in milliseconds.
        gap_ms: i64,
        /// The configured threshold that was exceeded.
        threshold_ms: i64,
    },
    /// GPS lock classification changed between consecutive samples.
    LockTransition {
        /// Timestamp of the sample where the new state was first observed.
        at: Timestamp,
        /// Previous classification.
        from: GpsLockState,
        /// New classification.
        to: GpsLockState,
    },
}

/// Receiver for diagnostic events.
///
/// The pipeline emits into a sink rather than logging directly so callers can
/// observe events programmatically (progress UIs, tests) as well as log them.
pub trait DiagnosticSink {
    /// Deliver one event.
    fn emit(&mut self, event: Diagnostic);
}

/// Sink that forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn emit(&mut self, event: Diagnostic) {
        match event {
            Diagnostic::GapTooLarge {
                from,
                to,
                gap_ms,
                threshold_ms,
            } => {
                tracing::warn!(
                    from_ms = from.millis(),
                    to_ms = to.millis(),
                    gap_ms,
                    threshold_ms,
                    "telemetry gap exceeds threshold; interpolating through"
                );
            }
            Diagnostic::LockTransition { at, from, to } => {
                tracing::debug!(at_ms = at.millis(), ?from, ?to, "gps lock transition");
            }
        }
    }
}

/// Collecting sink for tests and diagnostics readout.
#[derive(Clone, Debug, Default)]
pub struct VecDiagnostics {
    /// Events in emission order.
    pub events: Vec<Diagnostic>,
}

impl VecDiagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for VecDiagnostics {
    fn emit(&mut self, event: Diagnostic) {
        self.events.push(event);
    }
}
