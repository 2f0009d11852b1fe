//! Read-only named-metric views over an [`Entry`], with unit conversion.
//!
//! Reads are side-effect free and total over everything the timeline can
//! produce: a metric missing from a sparse entry reads as `0.0` rather than
//! failing, so one sensor dropping out never takes a widget down with it.

use std::str::FromStr;

use crate::foundation::error::{TracklayError, TracklayResult};
use crate::telemetry::timeseries::Entry;

/// A named metric carried by an [`Entry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Speed over ground (native m/s).
    Speed,
    /// Altitude (native meters).
    Altitude,
    /// Heart rate (native bpm).
    HeartRate,
    /// Cadence (native rpm).
    Cadence,
    /// Ambient temperature (native °C).
    Temperature,
    /// Latitude (native degrees).
    Latitude,
    /// Longitude (native degrees).
    Longitude,
}

/// A unit a metric can be read in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Meters per second.
    MetersPerSecond,
    /// Kilometers per hour.
    Kph,
    /// Miles per hour.
    Mph,
    /// Nautical miles per hour.
    Knots,
    /// Meters.
    Meters,
    /// Feet.
    Feet,
    /// Beats per minute.
    Bpm,
    /// Revolutions per minute.
    Rpm,
    /// Degrees Celsius.
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
    /// Angular degrees.
    Degrees,
}

/// Dimension shared by compatible metrics and units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dimension {
    Speed,
    Length,
    BeatRate,
    TurnRate,
    Temperature,
    Angle,
}

impl Metric {
    fn dimension(self) -> Dimension {
        match self {
            Self::Speed => Dimension::Speed,
            Self::Altitude => Dimension::Length,
            Self::HeartRate => Dimension::BeatRate,
            Self::Cadence => Dimension::TurnRate,
            Self::Temperature => Dimension::Temperature,
            Self::Latitude | Self::Longitude => Dimension::Angle,
        }
    }

    /// The unit the metric is natively stored in.
    pub fn native_unit(self) -> Unit {
        match self {
            Self::Speed => Unit::MetersPerSecond,
            Self::Altitude => Unit::Meters,
            Self::HeartRate => Unit::Bpm,
            Self::Cadence => Unit::Rpm,
            Self::Temperature => Unit::Celsius,
            Self::Latitude | Self::Longitude => Unit::Degrees,
        }
    }
}

impl Unit {
    fn dimension(self) -> Dimension {
        match self {
            Self::MetersPerSecond | Self::Kph | Self::Mph | Self::Knots => Dimension::Speed,
            Self::Meters | Self::Feet => Dimension::Length,
            Self::Bpm => Dimension::BeatRate,
            Self::Rpm => Dimension::TurnRate,
            Self::Celsius | Self::Fahrenheit => Dimension::Temperature,
            Self::Degrees => Dimension::Angle,
        }
    }
}

impl FromStr for Metric {
    type Err = TracklayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "speed" => Ok(Self::Speed),
            "alt" | "altitude" => Ok(Self::Altitude),
            "hr" | "heart-rate" | "heart_rate" => Ok(Self::HeartRate),
            "cadence" => Ok(Self::Cadence),
            "temp" | "temperature" => Ok(Self::Temperature),
            "lat" | "latitude" => Ok(Self::Latitude),
            "lon" | "longitude" => Ok(Self::Longitude),
            other => Err(TracklayError::UnknownMetric(other.to_owned())),
        }
    }
}

impl FromStr for Unit {
    type Err = TracklayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mps" | "m/s" => Ok(Self::MetersPerSecond),
            "kph" | "km/h" => Ok(Self::Kph),
            "mph" => Ok(Self::Mph),
            "knots" | "kt" => Ok(Self::Knots),
            "m" | "meters" | "metres" => Ok(Self::Meters),
            "ft" | "feet" => Ok(Self::Feet),
            "bpm" => Ok(Self::Bpm),
            "rpm" => Ok(Self::Rpm),
            "c" | "celsius" => Ok(Self::Celsius),
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            "deg" | "degrees" => Ok(Self::Degrees),
            other => Err(TracklayError::validation(format!("unknown unit: {other}"))),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Speed => "speed",
            Self::Altitude => "altitude",
            Self::HeartRate => "heart-rate",
            Self::Cadence => "cadence",
            Self::Temperature => "temperature",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MetersPerSecond => "m/s",
            Self::Kph => "kph",
            Self::Mph => "mph",
            Self::Knots => "knots",
            Self::Meters => "m",
            Self::Feet => "ft",
            Self::Bpm => "bpm",
            Self::Rpm => "rpm",
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
            Self::Degrees => "deg",
        };
        f.write_str(s)
    }
}

/// Read `metric` from `entry` converted to `unit`.
///
/// Missing fields read as `0.0`. Fails with
/// [`TracklayError::UnsupportedConversion`] when the unit's dimension does
/// not match the metric's.
pub fn read(entry: &Entry, metric: Metric, unit: Unit) -> TracklayResult<f64> {
    if metric.dimension() != unit.dimension() {
        return Err(TracklayError::UnsupportedConversion {
            metric: metric.to_string(),
            unit: unit.to_string(),
        });
    }

    let native = match metric {
        Metric::Speed => entry.speed,
        Metric::Altitude => entry.point.and_then(|p| p.alt),
        Metric::HeartRate => entry.heart_rate,
        Metric::Cadence => entry.cadence,
        Metric::Temperature => entry.temperature,
        Metric::Latitude => entry.point.map(|p| p.lat),
        Metric::Longitude => entry.point.map(|p| p.lon),
    }
    .unwrap_or(0.0);

    Ok(convert(native, unit))
}

fn convert(native: f64, unit: Unit) -> f64 {
    match unit {
        Unit::MetersPerSecond
        | Unit::Meters
        | Unit::Bpm
        | Unit::Rpm
        | Unit::Celsius
        | Unit::Degrees => native,
        Unit::Kph => native * 3.6,
        Unit::Mph => native * 2.236_936_292_054_402,
        Unit::Knots => native * 1.943_844_492_440_605,
        Unit::Feet => native * 3.280_839_895_013_123,
        Unit::Fahrenheit => native * 9.0 / 5.0 + 32.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{GeoPoint, Timestamp};
    use crate::telemetry::sample::Sample;
    use crate::telemetry::timeseries::Timeseries;

    fn entry() -> Entry {
        let mut ts = Timeseries::new();
        ts.insert(Sample {
            point: Some(GeoPoint {
                lat: 51.5,
                lon: -0.12,
                alt: Some(100.0),
            }),
            speed: Some(10.0),
            temperature: Some(20.0),
            heart_rate: Some(150.0),
            ..Sample::at(Timestamp(0))
        });
        ts.at(Timestamp(0)).unwrap()
    }

    #[test]
    fn native_reads_pass_values_through() {
        let e = entry();
        assert_eq!(read(&e, Metric::Speed, Unit::MetersPerSecond).unwrap(), 10.0);
        assert_eq!(read(&e, Metric::Altitude, Unit::Meters).unwrap(), 100.0);
        assert_eq!(read(&e, Metric::HeartRate, Unit::Bpm).unwrap(), 150.0);
        assert_eq!(read(&e, Metric::Latitude, Unit::Degrees).unwrap(), 51.5);
    }

    #[test]
    fn conversions_apply_expected_factors() {
        let e = entry();
        assert_eq!(read(&e, Metric::Speed, Unit::Kph).unwrap(), 36.0);
        let mph = read(&e, Metric::Speed, Unit::Mph).unwrap();
        assert!((mph - 22.369_363).abs() < 1e-5, "got {mph}");
        let knots = read(&e, Metric::Speed, Unit::Knots).unwrap();
        assert!((knots - 19.438_445).abs() < 1e-5, "got {knots}");
        let feet = read(&e, Metric::Altitude, Unit::Feet).unwrap();
        assert!((feet - 328.083_99).abs() < 1e-4, "got {feet}");
        assert_eq!(read(&e, Metric::Temperature, Unit::Fahrenheit).unwrap(), 68.0);
    }

    #[test]
    fn dimension_mismatch_is_an_unsupported_conversion() {
        let e = entry();
        assert!(matches!(
            read(&e, Metric::Speed, Unit::Feet),
            Err(TracklayError::UnsupportedConversion { .. })
        ));
        assert!(matches!(
            read(&e, Metric::HeartRate, Unit::Rpm),
            Err(TracklayError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn missing_fields_read_as_zero() {
        let mut ts = Timeseries::new();
        ts.insert(Sample::at(Timestamp(0)));
        let e = ts.at(Timestamp(0)).unwrap();
        assert_eq!(read(&e, Metric::Speed, Unit::Kph).unwrap(), 0.0);
        assert_eq!(read(&e, Metric::Altitude, Unit::Meters).unwrap(), 0.0);
        assert_eq!(read(&e, Metric::Cadence, Unit::Rpm).unwrap(), 0.0);
    }

    #[test]
    fn metric_parsing_accepts_aliases_and_rejects_unknowns() {
        assert_eq!(Metric::from_str("hr").unwrap(), Metric::HeartRate);
        assert_eq!(Metric::from_str("ALT").unwrap(), Metric::Altitude);
        assert!(matches!(
            Metric::from_str("watts"),
            Err(TracklayError::UnknownMetric(m)) if m == "watts"
        ));
        assert_eq!(Unit::from_str("km/h").unwrap(), Unit::Kph);
        assert!(Unit::from_str("furlongs").is_err());
    }
}
