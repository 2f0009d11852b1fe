//! Encoding sinks.
//!
//! Sinks consume composited frames in strict tick order under backpressure
//! and are driven by [`OverlaySession::render`](crate::OverlaySession).

/// `ffmpeg`-based sink (MP4 output via the system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink contract and built-in sinks.
pub mod sink;
