//! Solar position calculation
//!
//! Implements the NOAA general solar position equations (fractional year,
//! equation of time, declination, true solar time, hour angle). Azimuth is
//! taken from a two-argument arctangent so the result stays finite at the
//! poles and at the solar noon/midnight transitions.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::domain::{ForecastError, Location};

/// Sun position relative to an observer at one instant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SolarPosition {
    pub timestamp: DateTime<Utc>,
    /// Angle above the horizon; negative when the sun is below it
    pub elevation_deg: f64,
    /// Clockwise from north (0 = North, 90 = East, 180 = South, 270 = West)
    pub azimuth_deg: f64,
    /// 90 - elevation
    pub zenith_deg: f64,
    /// Signed angle from local solar noon, in [-180, 180)
    pub hour_angle_deg: f64,
    pub declination_deg: f64,
}

impl SolarPosition {
    pub fn is_above_horizon(&self) -> bool {
        self.elevation_deg > 0.0
    }

    /// Cosine of the angle between the sun vector and the normal of a plane
    /// tilted `tilt_deg` from horizontal and facing `surface_azimuth_deg`.
    ///
    /// Zero when the sun is below the horizon or behind the plane.
    pub fn incidence_cosine(&self, tilt_deg: f64, surface_azimuth_deg: f64) -> f64 {
        if !self.is_above_horizon() {
            return 0.0;
        }
        let zenith = self.zenith_deg.to_radians();
        let tilt = tilt_deg.to_radians();
        let relative_azimuth = (self.azimuth_deg - surface_azimuth_deg).to_radians();

        (zenith.cos() * tilt.cos() + zenith.sin() * tilt.sin() * relative_azimuth.cos()).max(0.0)
    }
}

/// Deterministic sun-position calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarGeometryEngine;

impl SolarGeometryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Sun position for a site at a UTC instant
    pub fn position(
        &self,
        location: &Location,
        timestamp: DateTime<Utc>,
    ) -> Result<SolarPosition, ForecastError> {
        location.ensure_valid()?;
        Ok(solar_position(
            location.latitude(),
            location.longitude(),
            timestamp,
        ))
    }

    /// Positions for many instants, computed in parallel, in input order
    pub fn positions(
        &self,
        location: &Location,
        timestamps: &[DateTime<Utc>],
    ) -> Result<Vec<SolarPosition>, ForecastError> {
        location.ensure_valid()?;
        let (latitude, longitude) = (location.latitude(), location.longitude());
        Ok(timestamps
            .par_iter()
            .map(|ts| solar_position(latitude, longitude, *ts))
            .collect())
    }
}

fn solar_position(latitude_deg: f64, longitude_deg: f64, timestamp: DateTime<Utc>) -> SolarPosition {
    let days_in_year = if is_leap_year(timestamp.year()) { 366.0 } else { 365.0 };
    let hour = timestamp.hour() as f64
        + timestamp.minute() as f64 / 60.0
        + timestamp.second() as f64 / 3600.0;

    // Fractional year (radians)
    let gamma = 2.0 * PI / days_in_year * (timestamp.ordinal0() as f64 + (hour - 12.0) / 24.0);

    let eq_time_minutes = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    let declination = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    // Timestamps are UTC, so there is no zone term in the offset
    let true_solar_minutes = hour * 60.0 + eq_time_minutes + 4.0 * longitude_deg;
    let hour_angle_deg = normalize_signed_degrees(true_solar_minutes / 4.0 - 180.0);

    let lat = latitude_deg.to_radians();
    let ha = hour_angle_deg.to_radians();

    let cos_zenith = (lat.sin() * declination.sin() + lat.cos() * declination.cos() * ha.cos())
        .clamp(-1.0, 1.0);
    let zenith_deg = cos_zenith.acos().to_degrees();

    // cos(declination) > 0 always, so scaling both arguments keeps the quadrant
    let azimuth_deg = (ha.sin() * declination.cos())
        .atan2(ha.cos() * lat.sin() * declination.cos() - declination.sin() * lat.cos())
        .to_degrees()
        + 180.0;

    SolarPosition {
        timestamp,
        elevation_deg: 90.0 - zenith_deg,
        azimuth_deg: azimuth_deg.rem_euclid(360.0),
        zenith_deg,
        hour_angle_deg,
        declination_deg: declination.to_degrees(),
    }
}

fn normalize_signed_degrees(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
