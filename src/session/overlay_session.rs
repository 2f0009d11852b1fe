use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::diag::DiagnosticSink;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameGeometry;
use crate::foundation::error::{TracklayError, TracklayResult};
use crate::render::backend::OverlayRenderer;
use crate::render::pool::{FramePool, FramePoolOpts};
use crate::telemetry::timeseries::Timeseries;
use crate::timeline::{FrameTimeline, TickSpacing};

/// External cancellation signal for a running render.
///
/// Clonable and cheap; flip it from a signal handler or another thread and
/// the session aborts at the next tick boundary, tearing the sink down.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Return `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Options controlling a render run.
#[derive(Clone, Copy, Debug)]
pub struct OverlaySessionOpts {
    /// Report telemetry gaps wider than this many milliseconds before the
    /// run starts. `None` disables the scan.
    pub gap_threshold_ms: Option<i64>,
    /// Frame pool caps.
    pub pool: FramePoolOpts,
}

impl Default for OverlaySessionOpts {
    fn default() -> Self {
        Self {
            gap_threshold_ms: Some(10_000),
            pool: FramePoolOpts::default(),
        }
    }
}

/// Run statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Ticks in the requested timeline.
    pub frames_total: u64,
    /// Frames accepted by the sink.
    pub frames_written: u64,
}

/// Drives the frame timeline through a renderer into a sink.
///
/// Single-writer by construction: one session borrows the (read-only)
/// timeseries and issues `submit` calls sequentially in tick order. Exactly
/// one buffer is produced per tick; a tick either reaches the sink or the
/// run aborts, never a silent frame drop.
pub struct OverlaySession<'a> {
    timeseries: &'a Timeseries,
    geometry: FrameGeometry,
    opts: OverlaySessionOpts,
}

impl<'a> OverlaySession<'a> {
    /// Create a session over an already-built timeseries.
    pub fn new(
        timeseries: &'a Timeseries,
        geometry: FrameGeometry,
        opts: OverlaySessionOpts,
    ) -> TracklayResult<Self> {
        geometry.validate()?;
        timeseries.bounds()?;
        Ok(Self {
            timeseries,
            geometry,
            opts,
        })
    }

    /// Render the whole timeline into `sink`.
    ///
    /// Per tick: check cancellation, borrow a pooled buffer, draw, submit,
    /// release the buffer once the sink has accepted it. A sink failure
    /// aborts the remaining timeline and surfaces [`TracklayError::SinkClosed`]
    /// with partial progress; cancellation tears the sink down (terminating
    /// any encoder subprocess) and surfaces [`TracklayError::Cancelled`].
    #[tracing::instrument(skip_all, fields(frames = self.geometry.frame_count))]
    pub fn render(
        &self,
        renderer: &mut dyn OverlayRenderer,
        sink: &mut dyn FrameSink,
        diag: &mut dyn DiagnosticSink,
        cancel: &CancelToken,
    ) -> TracklayResult<RenderStats> {
        if let Some(threshold) = self.opts.gap_threshold_ms {
            self.timeseries.scan_gaps(threshold, diag);
        }

        let timeline = FrameTimeline::new(
            self.timeseries,
            self.geometry.start,
            self.geometry.frame_count,
            TickSpacing::PerFrame(self.geometry.fps),
        )?;

        sink.begin(SinkConfig {
            width: self.geometry.width,
            height: self.geometry.height,
            fps: self.geometry.fps,
        })?;

        let mut pool = FramePool::new(self.opts.pool);
        let mut written = 0u64;

        for item in timeline.iter() {
            let (tick, entry) = match item {
                Ok(pair) => pair,
                Err(e) => {
                    sink.abort();
                    return Err(e);
                }
            };

            if cancel.is_cancelled() {
                sink.abort();
                tracing::info!(frames_written = written, "render cancelled");
                return Err(TracklayError::Cancelled {
                    frames_written: written,
                });
            }

            let mut frame = pool.borrow(self.geometry.width, self.geometry.height);
            if let Err(e) = renderer.draw(tick, &entry, &mut frame) {
                sink.abort();
                return Err(e);
            }

            match sink.submit(tick, &frame) {
                Ok(()) => {
                    written += 1;
                    pool.release(frame);
                }
                Err(e) => {
                    // The sink owns partial-progress context; just make sure
                    // the downstream is torn down before propagating.
                    sink.abort();
                    tracing::warn!(
                        tick = tick.index.0,
                        frames_written = written,
                        "sink rejected frame, aborting run"
                    );
                    return Err(e);
                }
            }
        }

        sink.finish()?;
        tracing::debug!(frames_written = written, "render complete");
        Ok(RenderStats {
            frames_total: self.geometry.frame_count,
            frames_written: written,
        })
    }
}
