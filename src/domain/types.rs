use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ForecastError;

// ============================================================================
// Site Types
// ============================================================================

/// Geographic site of the plant
///
/// Coordinates are validated on construction. The timezone decides which
/// calendar day and local hour an instant belongs to; it defaults to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    timezone: Tz,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ForecastError> {
        let location = Self {
            latitude,
            longitude,
            timezone: Tz::UTC,
        };
        location.ensure_valid()?;
        Ok(location)
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn is_southern_hemisphere(&self) -> bool {
        self.latitude < 0.0
    }

    /// Fails with `InvalidLocation` unless latitude is in [-90, 90] and
    /// longitude in [-180, 180]. NaN never passes.
    pub fn ensure_valid(&self) -> Result<(), ForecastError> {
        if (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude) {
            Ok(())
        } else {
            Err(ForecastError::InvalidLocation {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.4}, {:.4}) {}",
            self.latitude,
            self.longitude,
            self.timezone.name()
        )
    }
}

// ============================================================================
// Plant Types
// ============================================================================

/// Rated plant capacity in megawatts (MW)
///
/// Always finite and positive, including when deserialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
#[serde(try_from = "f64", into = "f64")]
pub struct PlantCapacity(f64);

impl PlantCapacity {
    pub fn megawatts(mw: f64) -> Result<Self, ForecastError> {
        if mw.is_finite() && mw > 0.0 {
            Ok(Self(mw))
        } else {
            Err(ForecastError::InvalidCapacity(mw))
        }
    }

    pub fn as_megawatts(&self) -> f64 {
        self.0
    }

    /// Denormalize a model fraction into megawatts, clamped to [0, capacity].
    ///
    /// Boosted trees are not bounded by construction, so overshoot in either
    /// direction is absorbed here. NaN maps to zero.
    pub fn scale(&self, fraction: f64) -> f64 {
        if fraction.is_nan() {
            return 0.0;
        }
        (fraction * self.0).clamp(0.0, self.0)
    }
}

impl TryFrom<f64> for PlantCapacity {
    type Error = ForecastError;

    fn try_from(mw: f64) -> Result<Self, Self::Error> {
        Self::megawatts(mw)
    }
}

impl From<PlantCapacity> for f64 {
    fn from(capacity: PlantCapacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for PlantCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} MW", self.0)
    }
}

/// Panel tilt from horizontal, in degrees within [0, 90]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
#[serde(from = "f64", into = "f64")]
pub struct TiltAngle(f64);

impl TiltAngle {
    pub const FLAT: TiltAngle = TiltAngle(0.0);
    pub const VERTICAL: TiltAngle = TiltAngle(90.0);

    /// Values outside [0, 90] are clamped; NaN is flat
    pub fn degrees(deg: f64) -> Self {
        if deg.is_nan() {
            return Self::FLAT;
        }
        Self(deg.clamp(0.0, 90.0))
    }

    pub fn as_degrees(&self) -> f64 {
        self.0
    }

    pub fn as_radians(&self) -> f64 {
        self.0.to_radians()
    }
}

impl From<f64> for TiltAngle {
    fn from(deg: f64) -> Self {
        Self::degrees(deg)
    }
}

impl From<TiltAngle> for f64 {
    fn from(tilt: TiltAngle) -> Self {
        tilt.0
    }
}

impl fmt::Display for TiltAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(40.7128, -74.0060)]
    fn test_location_accepts_valid_coordinates(#[case] lat: f64, #[case] lon: f64) {
        let location = Location::new(lat, lon).unwrap();
        assert_eq!(location.latitude(), lat);
        assert_eq!(location.longitude(), lon);
        assert_eq!(location.timezone(), Tz::UTC);
    }

    #[rstest]
    #[case(90.5, 0.0)]
    #[case(-91.0, 0.0)]
    #[case(0.0, 180.1)]
    #[case(0.0, -200.0)]
    #[case(f64::NAN, 0.0)]
    fn test_location_rejects_out_of_range(#[case] lat: f64, #[case] lon: f64) {
        let err = Location::new(lat, lon).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidLocation { .. }));
    }

    #[test]
    fn test_location_timezone() {
        let location = Location::new(40.7128, -74.0060)
            .unwrap()
            .with_timezone(chrono_tz::America::New_York);
        assert_eq!(location.timezone(), chrono_tz::America::New_York);
        assert!(!location.is_southern_hemisphere());
        assert!(location.to_string().contains("America/New_York"));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(f64::INFINITY)]
    #[case(f64::NAN)]
    fn test_capacity_rejects_non_positive(#[case] mw: f64) {
        assert!(matches!(
            PlantCapacity::megawatts(mw),
            Err(ForecastError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_capacity_scale() {
        let capacity = PlantCapacity::megawatts(100.0).unwrap();
        assert_eq!(capacity.scale(0.5), 50.0);
        assert_eq!(capacity.scale(1.7), 100.0);
        assert_eq!(capacity.scale(-0.2), 0.0);
        assert_eq!(capacity.scale(f64::NAN), 0.0);
        assert_eq!(capacity.to_string(), "100.00 MW");
    }

    #[test]
    fn test_tilt_angle_clamps() {
        assert_eq!(TiltAngle::degrees(-3.0), TiltAngle::FLAT);
        assert_eq!(TiltAngle::degrees(120.0), TiltAngle::VERTICAL);
        assert_eq!(TiltAngle::degrees(35.0).as_degrees(), 35.0);
    }

    #[test]
    fn test_capacity_deserialize_validates() {
        let capacity: PlantCapacity = serde_json::from_str("42.5").unwrap();
        assert_eq!(capacity.as_megawatts(), 42.5);
        assert_eq!(serde_json::to_string(&capacity).unwrap(), "42.5");

        assert!(serde_json::from_str::<PlantCapacity>("-5.0").is_err());
        assert!(serde_json::from_str::<PlantCapacity>("0.0").is_err());
        // JSON has no NaN literal; a null must not slip through either
        assert!(serde_json::from_str::<PlantCapacity>("null").is_err());
        assert!(PlantCapacity::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_tilt_deserialize_clamps() {
        let steep: TiltAngle = serde_json::from_str("120.0").unwrap();
        assert_eq!(steep, TiltAngle::VERTICAL);
        let negative: TiltAngle = serde_json::from_str("-10.0").unwrap();
        assert_eq!(negative, TiltAngle::FLAT);
        assert_eq!(TiltAngle::from(f64::NAN), TiltAngle::FLAT);
        assert_eq!(serde_json::to_string(&TiltAngle::degrees(32.0)).unwrap(), "32.0");
    }

    proptest! {
        #[test]
        fn prop_scaled_power_within_capacity(
            fraction in prop::num::f64::ANY,
            mw in 0.001f64..10_000.0,
        ) {
            let capacity = PlantCapacity::megawatts(mw).unwrap();
            let power = capacity.scale(fraction);
            prop_assert!(power >= 0.0);
            prop_assert!(power <= mw);
        }
    }
}
