use crate::foundation::core::{GeoPoint, Timestamp};

/// GPS receiver fix information as reported by the source stream.
///
/// `quality` follows the GoPro GPSF convention: 0 = no fix, 2 = 2D, 3 = 3D.
/// GPX/FIT decoders map their own fix fields onto the same scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GpsFix {
    /// Fix quality code.
    pub quality: u8,
    /// Number of satellites used for the fix.
    pub satellites: u8,
}

/// One decoded telemetry reading.
///
/// This is the interchange shape handed over by GPMD/GPX/FIT decoders.
/// Timestamps need not be evenly spaced and may repeat or jitter locally;
/// [`Timeseries`](crate::Timeseries) normalizes that on insert. Immutable
/// once ingested.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sample {
    /// Time of the reading on the recording clock.
    pub timestamp: Timestamp,
    /// Position, absent when the receiver had none (or it was scrubbed).
    #[serde(default)]
    pub point: Option<GeoPoint>,
    /// Speed over ground in m/s.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Heart rate in bpm.
    #[serde(default)]
    pub heart_rate: Option<f64>,
    /// Cadence in rpm.
    #[serde(default)]
    pub cadence: Option<f64>,
    /// Ambient temperature in °C.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Receiver fix information, when the source reports it.
    #[serde(default)]
    pub fix: Option<GpsFix>,
}

impl Sample {
    /// Create an empty sample at `timestamp`.
    pub fn at(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            point: None,
            speed: None,
            heart_rate: None,
            cadence: None,
            temperature: None,
            fix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_roundtrips_through_json_with_sparse_fields() {
        let json = r#"{"timestamp": 1500, "speed": 4.2}"#;
        let s: Sample = serde_json::from_str(json).unwrap();
        assert_eq!(s.timestamp, Timestamp(1500));
        assert_eq!(s.speed, Some(4.2));
        assert_eq!(s.point, None);
        assert_eq!(s.fix, None);

        let back = serde_json::to_string(&s).unwrap();
        let again: Sample = serde_json::from_str(&back).unwrap();
        assert_eq!(again, s);
    }
}
