use crate::foundation::error::{TracklayError, TracklayResult};

/// A point on the recording clock, in milliseconds.
///
/// Sources disagree about epochs (GPMD stream time, GPX wall time, FIT local
/// time); the orchestrating layer normalizes to one clock before ingest, and
/// everything downstream treats the value as opaque ordered milliseconds.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Milliseconds since the clock origin.
    pub fn millis(self) -> i64 {
        self.0
    }

    /// Shift by `delta_ms` milliseconds (negative shifts backwards).
    pub fn offset_by(self, delta_ms: i64) -> Self {
        Self(self.0.saturating_add(delta_ms))
    }

    /// Signed distance to `other` in milliseconds.
    pub fn millis_until(self, other: Timestamp) -> i64 {
        other.0.saturating_sub(self.0)
    }
}

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Output frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> TracklayResult<Self> {
        if den == 0 {
            return Err(TracklayError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(TracklayError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Time of the `i`-th frame relative to frame 0, in exact milliseconds.
    ///
    /// Uses rational math so tick times never drift: frame `i` lands at
    /// `i * 1000 * den / num` ms, truncated. For 30000/1001 this matches the
    /// encoder's own frame pacing to within one millisecond over any length.
    pub fn frame_offset_millis(self, i: u64) -> i64 {
        let n = i as i128 * 1000 * self.den as i128;
        (n / self.num as i128) as i64
    }

    /// Number of frames covering `secs` seconds, rounded to nearest.
    pub fn frames_for_secs(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }
}

/// A geographic position in raw degrees, altitude in meters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, north positive.
    pub lat: f64,
    /// Longitude in degrees, east positive.
    pub lon: f64,
    /// Altitude above the ellipsoid in meters, when the source reports one.
    pub alt: Option<f64>,
}

impl GeoPoint {
    /// Create a point without altitude.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            alt: None,
        }
    }

    /// Great-circle distance to `other` in meters (haversine, spherical earth).
    pub fn haversine_distance_m(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Target output geometry: pixel dimensions, frame rate, frame count, and the
/// telemetry-clock time of frame 0.
///
/// `start` is the clock-offset alignment knob: output frame 0 need not align
/// with the first telemetry sample. Callers derive it from the video start
/// time, or from file timestamps in track-only mode.
#[derive(Clone, Copy, Debug)]
pub struct FrameGeometry {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Total number of output frames.
    pub frame_count: u64,
    /// Telemetry-clock time of output frame 0.
    pub start: Timestamp,
}

impl FrameGeometry {
    /// Validate dimensions and frame count.
    pub fn validate(&self) -> TracklayResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TracklayError::validation(
                "frame width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Default encoder settings target yuv420p output.
            return Err(TracklayError::validation(
                "frame width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.frame_count == 0 {
            return Err(TracklayError::validation("frame_count must be non-zero"));
        }
        Ok(())
    }
}
