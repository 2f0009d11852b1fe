use std::collections::BTreeMap;

use crate::diag::{Diagnostic, DiagnosticSink};
use crate::foundation::core::{GeoPoint, Timestamp};
use crate::foundation::error::{TracklayError, TracklayResult};
use crate::telemetry::lock::{GpsLockState, LockFilter};
use crate::telemetry::sample::Sample;

/// Linear interpolation between two values of a type.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` at `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for GeoPoint {
    // Linear in raw degrees. This is a short-interval approximation that is
    // wrong near the poles and across the anti-meridian; consecutive
    // telemetry samples are close enough that it holds in practice.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            lat: f64::lerp(&a.lat, &b.lat, t),
            lon: f64::lerp(&a.lon, &b.lon, t),
            alt: lerp_opt(a.alt, b.alt, t),
        }
    }
}

// Sparse fields interpolate when both sides are present, hold the earlier
// side when only it is present, and stay absent otherwise.
fn lerp_opt(a: Option<f64>, b: Option<f64>, t: f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(f64::lerp(&x, &y, t)),
        (Some(x), None) => Some(x),
        (None, _) => None,
    }
}

fn lerp_opt_point(a: Option<GeoPoint>, b: Option<GeoPoint>, t: f64) -> Option<GeoPoint> {
    match (&a, &b) {
        (Some(x), Some(y)) => Some(GeoPoint::lerp(x, y, t)),
        (Some(_), None) => a,
        (None, _) => None,
    }
}

/// The materialized view of telemetry at one exact point in time.
///
/// Same shape as [`Sample`] minus receiver fix detail, but guaranteed to
/// exist for every time the timeline asks about: synthesized by interpolation
/// inside the sampled range and by clamping outside it, never absent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entry {
    /// The queried time (after clamping).
    pub timestamp: Timestamp,
    /// Interpolated position, absent where GPS was untrusted on both sides.
    pub point: Option<GeoPoint>,
    /// Speed over ground in m/s.
    pub speed: Option<f64>,
    /// Heart rate in bpm.
    pub heart_rate: Option<f64>,
    /// Cadence in rpm.
    pub cadence: Option<f64>,
    /// Ambient temperature in °C.
    pub temperature: Option<f64>,
}

impl Entry {
    fn from_sample(s: &Sample) -> Self {
        Self {
            timestamp: s.timestamp,
            point: s.point,
            speed: s.speed,
            heart_rate: s.heart_rate,
            cadence: s.cadence,
            temperature: s.temperature,
        }
    }

    fn between(a: &Sample, b: &Sample, at: Timestamp, t: f64) -> Self {
        Self {
            timestamp: at,
            point: lerp_opt_point(a.point, b.point, t),
            speed: lerp_opt(a.speed, b.speed, t),
            heart_rate: lerp_opt(a.heart_rate, b.heart_rate, t),
            cadence: lerp_opt(a.cadence, b.cadence, t),
            temperature: lerp_opt(a.temperature, b.temperature, t),
        }
    }
}

/// Ordered, deduplicated store of samples indexed by timestamp.
///
/// Built once during ingest, then read-only: every query borrows immutably,
/// so a constructed timeseries can be shared freely while the pipeline runs.
#[derive(Clone, Debug, Default)]
pub struct Timeseries {
    samples: BTreeMap<Timestamp, Sample>,
}

impl Timeseries {
    /// Create an empty timeseries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a decoded sample stream through a lock filter.
    ///
    /// The filter is applied per-sample (untrusted positions are nulled, the
    /// rest of the sample survives) and lock-state transitions are reported
    /// to `diag`.
    pub fn ingest(
        samples: impl IntoIterator<Item = Sample>,
        filter: &dyn LockFilter,
        diag: &mut dyn DiagnosticSink,
    ) -> Self {
        let mut ts = Self::new();
        let mut prev: Option<GpsLockState> = None;
        for sample in samples {
            let state = filter.classify(&sample);
            if let Some(p) = prev
                && p != state
            {
                diag.emit(Diagnostic::LockTransition {
                    at: sample.timestamp,
                    from: p,
                    to: state,
                });
            }
            prev = Some(state);
            ts.insert(filter.apply(sample));
        }
        ts
    }

    /// Insert one sample, preserving timestamp order.
    ///
    /// Duplicate timestamps resolve last-write-wins: source jitter from
    /// merged streams produces occasional collisions, and the later decode is
    /// the one kept. Returns `true` when an earlier sample was replaced.
    pub fn insert(&mut self, sample: Sample) -> bool {
        self.samples.insert(sample.timestamp, sample).is_some()
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Return `true` when no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate all samples in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.values()
    }

    /// All samples with `start <= timestamp <= end`, in order.
    pub fn range(&self, start: Timestamp, end: Timestamp) -> impl Iterator<Item = &Sample> {
        self.samples
            .range(start..)
            .take_while(move |(t, _)| **t <= end)
            .map(|(_, s)| s)
    }

    /// First and last timestamps, or [`TracklayError::EmptyTimeseries`].
    pub fn bounds(&self) -> TracklayResult<(Timestamp, Timestamp)> {
        match (self.samples.keys().next(), self.samples.keys().next_back()) {
            (Some(first), Some(last)) => Ok((*first, *last)),
            _ => Err(TracklayError::EmptyTimeseries),
        }
    }

    /// The interpolated view of telemetry at `t`.
    ///
    /// Exact hits reproduce the stored sample's fields verbatim. Interior
    /// misses linearly interpolate between the enclosing samples. Queries
    /// outside `[first, last]` clamp to the boundary sample; there is no
    /// extrapolation. A single-sample timeseries answers every query with
    /// that sample.
    pub fn at(&self, t: Timestamp) -> TracklayResult<Entry> {
        let (first, last) = self.bounds()?;
        let t = Timestamp(t.0.clamp(first.0, last.0));

        if let Some(s) = self.samples.get(&t) {
            return Ok(Entry::from_sample(s));
        }

        // After the clamp, t lies strictly between two stored samples.
        let (t0, before) = self
            .samples
            .range(..=t)
            .next_back()
            .ok_or_else(|| TracklayError::pipeline("query escaped clamp range (bug)"))?;
        let (t1, after) = self
            .samples
            .range(t..)
            .next()
            .ok_or_else(|| TracklayError::pipeline("query escaped clamp range (bug)"))?;

        let span = t0.millis_until(*t1);
        let ratio = t0.millis_until(t) as f64 / span as f64;
        Ok(Entry::between(before, after, t, ratio))
    }

    /// Report adjacent sample pairs further apart than `threshold_ms`.
    ///
    /// Oversized gaps are a visibility condition, not a failure: queries that
    /// land inside one still interpolate across it.
    pub fn scan_gaps(&self, threshold_ms: i64, diag: &mut dyn DiagnosticSink) {
        let mut prev: Option<Timestamp> = None;
        for &t in self.samples.keys() {
            if let Some(p) = prev {
                let gap_ms = p.millis_until(t);
                if gap_ms > threshold_ms {
                    diag.emit(Diagnostic::GapTooLarge {
                        from: p,
                        to: t,
                        gap_ms,
                        threshold_ms,
                    });
                }
            }
            prev = Some(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::VecDiagnostics;
    use crate::telemetry::lock::{NullLockFilter, StrictLockFilter};
    use crate::telemetry::sample::GpsFix;

    fn speed_sample(t: i64, speed: f64) -> Sample {
        Sample {
            speed: Some(speed),
            ..Sample::at(Timestamp(t))
        }
    }

    fn series(samples: impl IntoIterator<Item = Sample>) -> Timeseries {
        let mut d = VecDiagnostics::new();
        Timeseries::ingest(samples, &NullLockFilter, &mut d)
    }

    #[test]
    fn bounds_fails_on_empty() {
        assert!(matches!(
            Timeseries::new().bounds(),
            Err(TracklayError::EmptyTimeseries)
        ));
    }

    #[test]
    fn exact_hit_reproduces_stored_sample() {
        let ts = series([speed_sample(0, 0.0), speed_sample(10, 10.0)]);
        let e = ts.at(Timestamp(10)).unwrap();
        assert_eq!(e.timestamp, Timestamp(10));
        assert_eq!(e.speed, Some(10.0));
    }

    #[test]
    fn interior_query_interpolates_linearly() {
        let ts = series([speed_sample(0, 0.0), speed_sample(10, 10.0)]);
        assert_eq!(ts.at(Timestamp(4)).unwrap().speed, Some(4.0));
        assert_eq!(ts.at(Timestamp(5)).unwrap().speed, Some(5.0));
    }

    #[test]
    fn interpolation_is_monotone_between_monotone_samples() {
        let ts = series([
            speed_sample(0, 0.0),
            speed_sample(10, 10.0),
            speed_sample(20, 20.0),
        ]);
        let a = ts.at(Timestamp(3)).unwrap().speed.unwrap();
        let b = ts.at(Timestamp(11)).unwrap().speed.unwrap();
        let c = ts.at(Timestamp(19)).unwrap().speed.unwrap();
        assert!(a <= b && b <= c);
        assert!((0.0..=20.0).contains(&a));
        assert!((0.0..=20.0).contains(&c));
    }

    #[test]
    fn out_of_range_queries_clamp_to_boundaries() {
        let ts = series([speed_sample(0, 0.0), speed_sample(10, 10.0)]);
        assert_eq!(
            ts.at(Timestamp(-100)).unwrap().speed,
            ts.at(Timestamp(0)).unwrap().speed
        );
        assert_eq!(
            ts.at(Timestamp(99)).unwrap().speed,
            ts.at(Timestamp(10)).unwrap().speed
        );
    }

    #[test]
    fn single_sample_answers_every_query() {
        let ts = series([speed_sample(5, 7.0)]);
        for t in [-10, 0, 5, 100] {
            assert_eq!(ts.at(Timestamp(t)).unwrap().speed, Some(7.0));
        }
    }

    #[test]
    fn duplicate_timestamps_are_last_write_wins() {
        let mut ts = Timeseries::new();
        assert!(!ts.insert(speed_sample(5, 1.0)));
        assert!(ts.insert(speed_sample(5, 2.0)));
        assert_eq!(ts.len(), 1);
        assert_eq!(ts.at(Timestamp(5)).unwrap().speed, Some(2.0));
    }

    #[test]
    fn unordered_ingest_iterates_in_timestamp_order() {
        let ts = series([
            speed_sample(20, 2.0),
            speed_sample(0, 0.0),
            speed_sample(10, 1.0),
        ]);
        let times: Vec<i64> = ts.iter().map(|s| s.timestamp.millis()).collect();
        assert_eq!(times, vec![0, 10, 20]);
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let ts = series([
            speed_sample(0, 0.0),
            speed_sample(10, 1.0),
            speed_sample(20, 2.0),
            speed_sample(30, 3.0),
        ]);
        let got: Vec<i64> = ts
            .range(Timestamp(10), Timestamp(20))
            .map(|s| s.timestamp.millis())
            .collect();
        assert_eq!(got, vec![10, 20]);
        assert_eq!(ts.range(Timestamp(21), Timestamp(9)).count(), 0);
    }

    #[test]
    fn sparse_fields_hold_the_earlier_side() {
        let mut a = speed_sample(0, 1.0);
        a.heart_rate = Some(120.0);
        let b = speed_sample(10, 2.0); // no heart rate
        let ts = series([a, b]);

        let e = ts.at(Timestamp(5)).unwrap();
        assert_eq!(e.heart_rate, Some(120.0));
        assert_eq!(e.speed, Some(1.5));

        // Reversed: nothing to hold from the earlier side.
        let mut c = speed_sample(20, 3.0);
        c.cadence = Some(90.0);
        let ts = series([speed_sample(10, 2.0), c]);
        assert_eq!(ts.at(Timestamp(15)).unwrap().cadence, None);
    }

    #[test]
    fn position_interpolates_and_holds_like_other_fields() {
        let mut a = Sample::at(Timestamp(0));
        a.point = Some(GeoPoint {
            lat: 50.0,
            lon: 0.0,
            alt: Some(100.0),
        });
        let mut b = Sample::at(Timestamp(10));
        b.point = Some(GeoPoint {
            lat: 51.0,
            lon: 1.0,
            alt: Some(200.0),
        });
        let ts = series([a, b]);

        let p = ts.at(Timestamp(5)).unwrap().point.unwrap();
        assert_eq!(p.lat, 50.5);
        assert_eq!(p.lon, 0.5);
        assert_eq!(p.alt, Some(150.0));

        let mut c = Sample::at(Timestamp(20));
        c.point = None;
        let ts = series([b, c]);
        assert_eq!(ts.at(Timestamp(15)).unwrap().point, b.point);
    }

    #[test]
    fn scan_gaps_reports_only_oversized_gaps() {
        let ts = series([
            speed_sample(0, 0.0),
            speed_sample(1_000, 1.0),
            speed_sample(31_000, 2.0),
        ]);
        let mut d = VecDiagnostics::new();
        ts.scan_gaps(10_000, &mut d);
        assert_eq!(
            d.events,
            vec![Diagnostic::GapTooLarge {
                from: Timestamp(1_000),
                to: Timestamp(31_000),
                gap_ms: 30_000,
                threshold_ms: 10_000,
            }]
        );

        let mut d = VecDiagnostics::new();
        ts.scan_gaps(60_000, &mut d);
        assert!(d.events.is_empty());
    }

    #[test]
    fn ingest_reports_lock_transitions_and_scrubs_positions() {
        let locked = Sample {
            point: Some(GeoPoint::new(51.0, 0.0)),
            fix: Some(GpsFix {
                quality: 3,
                satellites: 10,
            }),
            ..Sample::at(Timestamp(0))
        };
        let unlocked = Sample {
            point: Some(GeoPoint::new(51.1, 0.0)),
            speed: Some(4.0),
            fix: Some(GpsFix {
                quality: 2,
                satellites: 10,
            }),
            ..Sample::at(Timestamp(1_000))
        };

        let mut d = VecDiagnostics::new();
        let ts = Timeseries::ingest([locked, unlocked], &StrictLockFilter::default(), &mut d);

        assert_eq!(
            d.events,
            vec![Diagnostic::LockTransition {
                at: Timestamp(1_000),
                from: GpsLockState::Locked,
                to: GpsLockState::Unlocked,
            }]
        );
        let e = ts.at(Timestamp(1_000)).unwrap();
        assert_eq!(e.point, None);
        assert_eq!(e.speed, Some(4.0));
    }
}
