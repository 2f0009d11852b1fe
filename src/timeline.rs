//! Maps a target output frame rate and time window onto a [`Timeseries`],
//! producing one interpolated [`Entry`] per output frame.

use crate::foundation::core::{FrameIndex, Fps, Timestamp};
use crate::foundation::error::{TracklayError, TracklayResult};
use crate::telemetry::timeseries::{Entry, Timeseries};

/// One discrete output-frame time step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// 0-based output frame index.
    pub index: FrameIndex,
    /// Telemetry-clock time of this frame.
    pub time: Timestamp,
}

/// How tick times advance from the timeline start.
#[derive(Clone, Copy, Debug)]
pub enum TickSpacing {
    /// Fixed spacing in milliseconds.
    Millis(i64),
    /// Spacing derived from a rational frame rate, without cumulative drift.
    PerFrame(Fps),
}

impl TickSpacing {
    fn validate(self) -> TracklayResult<()> {
        match self {
            Self::Millis(ms) if ms <= 0 => Err(TracklayError::validation(
                "tick spacing must be a positive number of milliseconds",
            )),
            _ => Ok(()),
        }
    }

    fn offset_millis(self, i: u64) -> i64 {
        match self {
            Self::Millis(ms) => (i as i128 * ms as i128) as i64,
            Self::PerFrame(fps) => fps.frame_offset_millis(i),
        }
    }
}

/// A finite, restartable sequence of interpolated entries, one per output
/// frame.
///
/// The timeline borrows the (read-only) timeseries and is a pure function of
/// its inputs: iterating twice yields identical entries. Frame 0 is at
/// `start`, which need not align with the first telemetry sample; ticks
/// before the first or after the last sample clamp to the boundary entry so
/// frames without telemetry still render a plausible overlay.
#[derive(Clone, Copy, Debug)]
pub struct FrameTimeline<'a> {
    timeseries: &'a Timeseries,
    start: Timestamp,
    frame_count: u64,
    spacing: TickSpacing,
}

impl<'a> FrameTimeline<'a> {
    /// Create a timeline of `frame_count` ticks starting at `start`.
    ///
    /// Fails with [`TracklayError::EmptyTimeseries`] when the series has no
    /// samples; every later query is then total.
    pub fn new(
        timeseries: &'a Timeseries,
        start: Timestamp,
        frame_count: u64,
        spacing: TickSpacing,
    ) -> TracklayResult<Self> {
        timeseries.bounds()?;
        spacing.validate()?;
        if frame_count == 0 {
            return Err(TracklayError::validation(
                "timeline frame_count must be non-zero",
            ));
        }
        Ok(Self {
            timeseries,
            start,
            frame_count,
            spacing,
        })
    }

    /// Number of ticks in the timeline.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Time of tick `i`. Pure; valid for any `i < frame_count`.
    pub fn tick_time(&self, i: u64) -> Timestamp {
        self.start.offset_by(self.spacing.offset_millis(i))
    }

    /// The interpolated entry at tick `i`.
    pub fn entry(&self, i: u64) -> TracklayResult<Entry> {
        if i >= self.frame_count {
            return Err(TracklayError::pipeline(format!(
                "tick {i} out of range (frame_count {})",
                self.frame_count
            )));
        }
        self.timeseries.at(self.tick_time(i))
    }

    /// Iterate `(Tick, Entry)` pairs in tick order.
    pub fn iter(&self) -> TimelineIter<'a> {
        TimelineIter {
            timeline: *self,
            next: 0,
        }
    }
}

/// Iterator over a [`FrameTimeline`].
#[derive(Clone, Debug)]
pub struct TimelineIter<'a> {
    timeline: FrameTimeline<'a>,
    next: u64,
}

impl Iterator for TimelineIter<'_> {
    type Item = TracklayResult<(Tick, Entry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.timeline.frame_count {
            return None;
        }
        let i = self.next;
        self.next += 1;
        let tick = Tick {
            index: FrameIndex(i),
            time: self.timeline.tick_time(i),
        };
        Some(self.timeline.entry(i).map(|entry| (tick, entry)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.timeline.frame_count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimelineIter<'_> {}
