use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hourly weather observation for the plant site
///
/// Fields are optional on the wire so that an adapter can report a gap; the
/// feature builder rejects any observation with a missing field instead of
/// interpolating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub timestamp: DateTime<Utc>,
    /// Air temperature (Celsius)
    #[serde(default)]
    pub temperature_c: Option<f64>,
    /// Cloud cover (0.0-1.0)
    #[serde(default)]
    pub cloud_cover_fraction: Option<f64>,
    /// Relative humidity (0.0-1.0)
    #[serde(default)]
    pub humidity_fraction: Option<f64>,
    /// Wind speed (m/s)
    #[serde(default)]
    pub wind_speed_ms: Option<f64>,
}

impl WeatherObservation {
    /// Complete observation with every field present
    pub fn new(
        timestamp: DateTime<Utc>,
        temperature_c: f64,
        cloud_cover_fraction: f64,
        humidity_fraction: f64,
        wind_speed_ms: f64,
    ) -> Self {
        Self {
            timestamp,
            temperature_c: Some(temperature_c),
            cloud_cover_fraction: Some(cloud_cover_fraction),
            humidity_fraction: Some(humidity_fraction),
            wind_speed_ms: Some(wind_speed_ms),
        }
    }
}
