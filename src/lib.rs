//! Tracklay turns irregularly-sampled telemetry (GPS position, speed, heart
//! rate, cadence, temperature) into a deterministic per-output-frame stream of
//! interpolated readings, and drives frame-synchronized overlay compositing
//! into an external encoder process.
//!
//! The public API is session-oriented:
//!
//! - Ingest decoded samples into a [`Timeseries`] (optionally through a
//!   [`LockFilter`] and a [`PrivacyZone`])
//! - Describe the output with a [`FrameGeometry`]
//! - Create an [`OverlaySession`] and stream frames into a [`FrameSink`]
//!
//! Binary telemetry demuxing (GPMD) and GPX/FIT parsing are external
//! collaborators; they hand over an ordered stream of [`Sample`] values.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod diag;
/// Encoding sinks (ffmpeg subprocess, in-memory test sink).
pub mod encode;
pub(crate) mod metrics;
/// Frame buffers, the renderer seam, and the bounded frame pool.
pub mod render;
/// Session-oriented compositing driver.
pub mod session;
/// Telemetry samples, GPS lock filtering, and the timeseries store.
pub mod telemetry;
/// Frame timeline construction over a timeseries.
pub mod timeline;

pub use crate::foundation::core::{FrameGeometry, FrameIndex, Fps, GeoPoint, Timestamp};
pub use crate::foundation::error::{TracklayError, TracklayResult};

pub use crate::diag::{Diagnostic, DiagnosticSink, LogDiagnostics, VecDiagnostics};
pub use crate::encode::ffmpeg::{EncodeProfile, FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::metrics::{Metric, Unit, read};
pub use crate::render::backend::{FrameRgba, OverlayRenderer, SolidRenderer};
pub use crate::render::pool::{FramePool, FramePoolOpts, FramePoolStats};
pub use crate::session::overlay_session::{
    CancelToken, OverlaySession, OverlaySessionOpts, RenderStats,
};
pub use crate::telemetry::lock::{
    GpsLockState, LockFilter, NullLockFilter, PrivacyZone, StrictLockFilter,
};
pub use crate::telemetry::sample::{GpsFix, Sample};
pub use crate::telemetry::timeseries::{Entry, Timeseries};
pub use crate::timeline::{FrameTimeline, Tick, TickSpacing};
