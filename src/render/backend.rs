use crate::foundation::error::TracklayResult;
use crate::telemetry::timeseries::Entry;
use crate::timeline::Tick;

/// One frame as opaque RGBA8 pixels, tightly packed, row-major.
///
/// Overlay output is flattened by the renderer; the encoder receives fully
/// opaque frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` of them.
    pub data: Vec<u8>,
}

impl FrameRgba {
    /// Allocate a zeroed frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    /// Fill the whole frame with one RGBA color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}

/// The widget draw contract, owned by the (external) layout subsystem.
///
/// Called exactly once per tick, in tick order, with the interpolated entry
/// for that tick. The renderer must write every pixel of `frame`; buffers may
/// arrive from a pool and are zeroed, not carrying the previous frame.
pub trait OverlayRenderer {
    /// Draw the overlay for one tick into `frame`.
    fn draw(&mut self, tick: Tick, entry: &Entry, frame: &mut FrameRgba) -> TracklayResult<()>;
}

impl<F> OverlayRenderer for F
where
    F: FnMut(Tick, &Entry, &mut FrameRgba) -> TracklayResult<()>,
{
    fn draw(&mut self, tick: Tick, entry: &Entry, frame: &mut FrameRgba) -> TracklayResult<()> {
        self(tick, entry, frame)
    }
}

/// Renderer that fills frames with a single background color.
///
/// Stands in for the widget layer in tests and in the CLI's no-layout mode;
/// useful for verifying encoder plumbing without any drawing stack.
#[derive(Clone, Copy, Debug)]
pub struct SolidRenderer {
    /// Background color, RGBA8.
    pub bg_rgba: [u8; 4],
}

impl Default for SolidRenderer {
    fn default() -> Self {
        Self {
            bg_rgba: [18, 20, 28, 255],
        }
    }
}

impl OverlayRenderer for SolidRenderer {
    fn draw(&mut self, _tick: Tick, _entry: &Entry, frame: &mut FrameRgba) -> TracklayResult<()> {
        frame.fill(self.bg_rgba);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{FrameIndex, Timestamp};

    fn tick() -> Tick {
        Tick {
            index: FrameIndex(0),
            time: Timestamp(0),
        }
    }

    fn entry() -> Entry {
        use crate::telemetry::sample::Sample;
        use crate::telemetry::timeseries::Timeseries;
        let mut ts = Timeseries::new();
        ts.insert(Sample::at(Timestamp(0)));
        ts.at(Timestamp(0)).unwrap()
    }

    #[test]
    fn solid_renderer_covers_every_pixel() {
        let mut frame = FrameRgba::new(4, 2);
        let mut r = SolidRenderer {
            bg_rgba: [1, 2, 3, 255],
        };
        r.draw(tick(), &entry(), &mut frame).unwrap();
        for px in frame.data.chunks_exact(4) {
            assert_eq!(px, [1, 2, 3, 255]);
        }
    }

    #[test]
    fn closures_satisfy_the_renderer_contract() {
        let mut calls = 0u32;
        let mut r = |_tick: Tick, _entry: &Entry, frame: &mut FrameRgba| -> TracklayResult<()> {
            frame.fill([255, 0, 0, 255]);
            calls += 1;
            Ok(())
        };
        let mut frame = FrameRgba::new(2, 2);
        r.draw(tick(), &entry(), &mut frame).unwrap();
        drop(r);
        assert_eq!(calls, 1);
        assert_eq!(&frame.data[0..4], &[255, 0, 0, 255]);
    }
}
