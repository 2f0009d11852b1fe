use crate::foundation::core::GeoPoint;
use crate::telemetry::sample::Sample;

/// Per-sample confidence classification of positional accuracy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpsLockState {
    /// The receiver had an adequate fix; position is trusted.
    Locked,
    /// Fix information was present but below the configured bar.
    Unlocked,
    /// The sample carried no fix information at all.
    Unknown,
}

/// Instantaneous per-sample lock classification.
///
/// Deliberately stateless: no smoothing or hysteresis across samples. A
/// sample that fails classification keeps all its non-positional fields;
/// only `point` is scrubbed, so sparse-GPS sources still contribute speed,
/// heart rate and the rest.
pub trait LockFilter {
    /// Classify one sample.
    fn classify(&self, sample: &Sample) -> GpsLockState;

    /// Return `sample` with the position nulled unless classification is
    /// [`GpsLockState::Locked`].
    fn apply(&self, sample: Sample) -> Sample {
        match self.classify(&sample) {
            GpsLockState::Locked => sample,
            GpsLockState::Unlocked | GpsLockState::Unknown => Sample {
                point: None,
                ..sample
            },
        }
    }
}

/// Pass-through filter: every sample is considered locked.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLockFilter;

impl LockFilter for NullLockFilter {
    fn classify(&self, _sample: &Sample) -> GpsLockState {
        GpsLockState::Locked
    }
}

/// Filter requiring a minimum fix quality and a satellite count within a
/// configured band.
#[derive(Clone, Copy, Debug)]
pub struct StrictLockFilter {
    /// Minimum acceptable fix quality code (3 = 3D fix).
    pub min_quality: u8,
    /// Minimum satellites used for the fix.
    pub min_satellites: u8,
    /// Maximum satellites considered plausible; counts above this indicate a
    /// corrupt stream rather than a great fix.
    pub max_satellites: u8,
}

impl Default for StrictLockFilter {
    fn default() -> Self {
        Self {
            min_quality: 3,
            min_satellites: 4,
            max_satellites: 40,
        }
    }
}

impl LockFilter for StrictLockFilter {
    fn classify(&self, sample: &Sample) -> GpsLockState {
        let Some(fix) = sample.fix else {
            return GpsLockState::Unknown;
        };
        if fix.quality >= self.min_quality
            && fix.satellites >= self.min_satellites
            && fix.satellites <= self.max_satellites
        {
            GpsLockState::Locked
        } else {
            GpsLockState::Unlocked
        }
    }
}

/// Position scrubber for a circular privacy zone.
///
/// Samples whose position falls within `radius_m` of `center` have their
/// position removed before ingest; everything else in the sample survives.
#[derive(Clone, Copy, Debug)]
pub struct PrivacyZone {
    /// Zone center.
    pub center: GeoPoint,
    /// Zone radius in meters.
    pub radius_m: f64,
}

impl PrivacyZone {
    /// Return `true` when `point` lies inside the zone.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.haversine_distance_m(point) <= self.radius_m
    }

    /// Return `sample` with the position removed if it falls in the zone.
    pub fn apply(&self, sample: Sample) -> Sample {
        match sample.point {
            Some(p) if self.contains(&p) => Sample {
                point: None,
                ..sample
            },
            _ => sample,
        }
    }
}
