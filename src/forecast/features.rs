//! Feature engineering for the power forecast model
//!
//! This module turns a weather observation and the solar position for the
//! same instant into the fixed-order vector the model was trained on.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::domain::{ForecastError, Location, WeatherObservation};
use crate::geometry::{ClearSkyModel, SolarPosition};

/// Bumped whenever `FEATURE_NAMES` changes; a model trained on another
/// version must be retrained.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Field order shared with the trained model
pub const FEATURE_NAMES: [&str; 14] = [
    "month",
    "hour",
    "temp",
    "max_temp",
    "min_temp",
    "avg_temp",
    "temp_diff",
    "cloud_cover",
    "humidity",
    "wind_speed",
    "elevation_deg",
    "azimuth_deg",
    "zenith_deg",
    "clear_sky_w_m2",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
}

/// Model input for one timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named feature, if this vector follows the current schema
    pub fn get(&self, name: &str) -> Option<f64> {
        if self.values.len() != FEATURE_COUNT {
            return None;
        }
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }
}

/// Temperature statistics over one local calendar day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyTemperature {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
}

impl DailyTemperature {
    fn single(temperature_c: f64) -> Self {
        Self {
            max: temperature_c,
            min: temperature_c,
            mean: temperature_c,
        }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Observation with every required field present and fractions clipped
#[derive(Debug, Clone, Copy)]
struct CheckedObservation {
    timestamp: DateTime<Utc>,
    temperature_c: f64,
    cloud_cover: f64,
    humidity: f64,
    wind_speed_ms: f64,
}

/// Builds feature vectors for one site
pub struct FeatureBuilder {
    timezone: Tz,
    clear_sky: ClearSkyModel,
}

impl FeatureBuilder {
    /// Local hour, month and day grouping follow `timezone`
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            clear_sky: ClearSkyModel::default(),
        }
    }

    pub fn for_location(location: &Location) -> Self {
        Self::new(location.timezone())
    }

    /// Feature vector for a single observation
    ///
    /// Without the rest of the day available, the observation's own
    /// temperature stands in for the daily statistics.
    pub fn build(
        &self,
        observation: &WeatherObservation,
        position: &SolarPosition,
    ) -> Result<FeatureVector, ForecastError> {
        let checked = check_observation(observation)?;
        Ok(self.assemble(&checked, position, DailyTemperature::single(checked.temperature_c)))
    }

    /// Feature vectors for a whole series, in input order
    ///
    /// Daily temperature statistics are computed per local calendar day over
    /// the series. Fails on the first incomplete observation, or with
    /// `SeriesLengthMismatch` unless there is one position per observation.
    pub fn build_series(
        &self,
        observations: &[WeatherObservation],
        positions: &[SolarPosition],
    ) -> Result<Vec<FeatureVector>, ForecastError> {
        if observations.len() != positions.len() {
            return Err(ForecastError::SeriesLengthMismatch {
                observations: observations.len(),
                positions: positions.len(),
            });
        }

        let checked = observations
            .iter()
            .map(check_observation)
            .collect::<Result<Vec<_>, _>>()?;
        let daily = self.daily_temperatures(&checked);

        Ok(checked
            .par_iter()
            .zip(positions.par_iter())
            .map(|(obs, pos)| {
                let day = daily[&self.local_date(obs.timestamp)];
                self.assemble(obs, pos, day)
            })
            .collect())
    }

    fn daily_temperatures(&self, observations: &[CheckedObservation]) -> HashMap<NaiveDate, DailyTemperature> {
        let mut accum: HashMap<NaiveDate, (f64, f64, f64, usize)> = HashMap::new();
        for obs in observations {
            let entry = accum
                .entry(self.local_date(obs.timestamp))
                .or_insert((f64::NEG_INFINITY, f64::INFINITY, 0.0, 0));
            entry.0 = entry.0.max(obs.temperature_c);
            entry.1 = entry.1.min(obs.temperature_c);
            entry.2 += obs.temperature_c;
            entry.3 += 1;
        }

        accum
            .into_iter()
            .map(|(date, (max, min, sum, count))| {
                (
                    date,
                    DailyTemperature {
                        max,
                        min,
                        mean: sum / count as f64,
                    },
                )
            })
            .collect()
    }

    fn local_date(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        timestamp.with_timezone(&self.timezone).date_naive()
    }

    fn assemble(
        &self,
        obs: &CheckedObservation,
        position: &SolarPosition,
        day: DailyTemperature,
    ) -> FeatureVector {
        let local = obs.timestamp.with_timezone(&self.timezone);

        FeatureVector {
            timestamp: obs.timestamp,
            values: vec![
                local.month() as f64,
                local.hour() as f64,
                obs.temperature_c,
                day.max,
                day.min,
                day.mean,
                day.range(),
                obs.cloud_cover,
                obs.humidity,
                obs.wind_speed_ms,
                position.elevation_deg,
                position.azimuth_deg,
                position.zenith_deg,
                self.clear_sky.horizontal_irradiance(position),
            ],
        }
    }
}

fn check_observation(observation: &WeatherObservation) -> Result<CheckedObservation, ForecastError> {
    let timestamp = observation.timestamp;
    let temperature_c = required(observation.temperature_c, "temperature_c", timestamp)?;
    let cloud_cover = required(observation.cloud_cover_fraction, "cloud_cover_fraction", timestamp)?;
    let humidity = required(observation.humidity_fraction, "humidity_fraction", timestamp)?;
    let wind_speed_ms = required(observation.wind_speed_ms, "wind_speed_ms", timestamp)?;

    Ok(CheckedObservation {
        timestamp,
        temperature_c,
        cloud_cover: clip_fraction(cloud_cover, "cloud_cover_fraction", timestamp),
        humidity: clip_fraction(humidity, "humidity_fraction", timestamp),
        wind_speed_ms,
    })
}

fn required(
    value: Option<f64>,
    field: &'static str,
    timestamp: DateTime<Utc>,
) -> Result<f64, ForecastError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ForecastError::IncompleteObservation { timestamp, field }),
    }
}

fn clip_fraction(value: f64, field: &'static str, timestamp: DateTime<Utc>) -> f64 {
    if (0.0..=1.0).contains(&value) {
        return value;
    }
    warn!(%timestamp, field, value, "clipping out-of-range fraction");
    value.clamp(0.0, 1.0)
}
