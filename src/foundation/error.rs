/// Convenience alias used throughout the crate.
pub type TracklayResult<T> = Result<T, TracklayError>;

/// Error taxonomy for timeline construction and the compositing pipeline.
///
/// Gap-too-large conditions are deliberately absent: oversized telemetry gaps
/// are interpolated through and surfaced as [`crate::Diagnostic`] events, not
/// errors.
#[derive(thiserror::Error, Debug)]
pub enum TracklayError {
    /// No samples available; fatal to timeline construction.
    #[error("timeseries is empty")]
    EmptyTimeseries,

    /// A metric identifier was not recognized by the accessor layer.
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// A unit incompatible with the metric's native dimension was requested.
    #[error("unsupported conversion: {metric} -> {unit}")]
    UnsupportedConversion {
        /// The metric that was being read.
        metric: String,
        /// The requested unit.
        unit: String,
    },

    /// The downstream encoder terminated or its input channel closed.
    ///
    /// Fatal to the remaining run; `frames_written` reports partial progress
    /// for diagnostics.
    #[error("sink closed after {frames_written} frames: {detail}")]
    SinkClosed {
        /// Frames successfully accepted before the sink went away.
        frames_written: u64,
        /// Downstream failure detail (exit status, stderr tail, io error).
        detail: String,
    },

    /// The run was cancelled by an external signal.
    #[error("render cancelled after {frames_written} frames")]
    Cancelled {
        /// Frames successfully accepted before cancellation.
        frames_written: u64,
    },

    /// Invalid input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal pipeline invariant violation.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Wrapped error from a collaborator boundary.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TracklayError {
    /// Build a [`TracklayError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TracklayError::Pipeline`].
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Build a [`TracklayError::SinkClosed`].
    pub fn sink_closed(frames_written: u64, detail: impl Into<String>) -> Self {
        Self::SinkClosed {
            frames_written,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert_eq!(
            TracklayError::EmptyTimeseries.to_string(),
            "timeseries is empty"
        );
        assert!(
            TracklayError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            TracklayError::sink_closed(3, "broken pipe")
                .to_string()
                .contains("after 3 frames")
        );
        assert!(
            TracklayError::UnknownMetric("watts".into())
                .to_string()
                .contains("watts")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = TracklayError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
