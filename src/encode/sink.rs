use crate::foundation::core::Fps;
use crate::foundation::error::{TracklayError, TracklayResult};
use crate::render::backend::FrameRgba;
use crate::timeline::Tick;

/// Configuration provided to a [`FrameSink`] at the start of a run.
#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

/// Sink contract for consuming composited frames in tick order.
///
/// Ordering: `submit` is called with strictly increasing tick indices; a sink
/// must reject anything else. Backpressure: `submit` blocks while the
/// downstream consumer cannot accept more data, rather than buffering
/// unboundedly. Failure: once the downstream is gone, `submit` fails fast
/// with [`TracklayError::SinkClosed`] carrying the frames written so far, and
/// every later call fails the same way with no further writes.
///
/// `finish` and `abort` both guarantee the downstream channel ends up closed;
/// `abort` additionally discards whatever was in flight (the cancellation
/// path).
pub trait FrameSink: Send {
    /// Called once before any frames are submitted.
    fn begin(&mut self, cfg: SinkConfig) -> TracklayResult<()>;
    /// Submit one frame, blocking under downstream backpressure.
    fn submit(&mut self, tick: Tick, frame: &FrameRgba) -> TracklayResult<()>;
    /// Flush and close the downstream channel after the last frame.
    fn finish(&mut self) -> TracklayResult<()>;
    /// Tear the downstream channel down without flushing (cancellation/error
    /// path). Must be safe to call at any point, including after a failure.
    fn abort(&mut self);
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(Tick, FrameRgba)>,
    aborted: bool,
    finished: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(Tick, FrameRgba)] {
        &self.frames
    }

    /// Whether `abort` was called.
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }

    /// Whether `finish` completed.
    pub fn was_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> TracklayResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.aborted = false;
        self.finished = false;
        Ok(())
    }

    fn submit(&mut self, tick: Tick, frame: &FrameRgba) -> TracklayResult<()> {
        if self.cfg.is_none() {
            return Err(TracklayError::pipeline("sink not started"));
        }
        if let Some((last, _)) = self.frames.last()
            && tick.index.0 <= last.index.0
        {
            return Err(TracklayError::pipeline(
                "sink received out-of-order tick index",
            ));
        }
        self.frames.push((tick, frame.clone()));
        Ok(())
    }

    fn finish(&mut self) -> TracklayResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{FrameIndex, Timestamp};

    fn tick(i: u64) -> Tick {
        Tick {
            index: FrameIndex(i),
            time: Timestamp(i as i64 * 33),
        }
    }

    fn cfg() -> SinkConfig {
        SinkConfig {
            width: 2,
            height: 2,
            fps: Fps::new(30, 1).unwrap(),
        }
    }

    #[test]
    fn in_memory_sink_preserves_submission_order() {
        let mut sink = InMemorySink::new();
        sink.begin(cfg()).unwrap();
        let frame = FrameRgba::new(2, 2);
        for i in 0..4 {
            sink.submit(tick(i), &frame).unwrap();
        }
        sink.finish().unwrap();
        assert_eq!(sink.frames().len(), 4);
        for (i, (t, _)) in sink.frames().iter().enumerate() {
            assert_eq!(t.index.0, i as u64);
        }
        assert!(sink.was_finished());
    }

    #[test]
    fn submit_without_begin_is_a_pipeline_error() {
        let mut sink = InMemorySink::new();
        assert!(sink.submit(tick(0), &FrameRgba::new(2, 2)).is_err());
    }

    #[test]
    fn out_of_order_ticks_are_rejected() {
        let mut sink = InMemorySink::new();
        sink.begin(cfg()).unwrap();
        let frame = FrameRgba::new(2, 2);
        sink.submit(tick(1), &frame).unwrap();
        assert!(sink.submit(tick(1), &frame).is_err());
        assert!(sink.submit(tick(0), &frame).is_err());
    }
}
