//! Panel tilt optimization
//!
//! Sweeps candidate tilts for an equator-facing panel and scores each one by
//! the clear-sky beam it collects over an hourly grid spanning a reference
//! year. The grid positions are computed once and shared by every candidate.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info, warn};

use crate::domain::{ForecastError, Location, TiltAngle};
use crate::geometry::{ClearSkyModel, SolarGeometryEngine, SolarPosition};

/// Meteorological season, resolved per hemisphere
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Calendar months (1-12) of the season at the given site
    pub fn months(&self, location: &Location) -> [u32; 3] {
        let northern = match self {
            Season::Spring => [3, 4, 5],
            Season::Summer => [6, 7, 8],
            Season::Autumn => [9, 10, 11],
            Season::Winter => [12, 1, 2],
        };
        if location.is_southern_hemisphere() {
            northern.map(|m| (m + 5) % 12 + 1)
        } else {
            northern
        }
    }
}

/// Score of one candidate tilt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltScore {
    pub tilt: TiltAngle,
    /// Cumulative beam proxy collected over the grid
    pub score: f64,
}

/// Finds the fixed tilt that maximizes collected clear-sky beam
#[derive(Debug, Clone)]
pub struct TiltAngleOptimizer {
    step_deg: f64,
    tie_epsilon: f64,
    reference_year: i32,
    clear_sky: ClearSkyModel,
    engine: SolarGeometryEngine,
}

impl Default for TiltAngleOptimizer {
    fn default() -> Self {
        Self::new(1.0, 1e-4, 2023)
    }
}

impl TiltAngleOptimizer {
    /// `step_deg` is clamped to [0.1, 90]; a negative epsilon counts as zero
    pub fn new(step_deg: f64, tie_epsilon: f64, reference_year: i32) -> Self {
        let step_deg = if step_deg.is_finite() { step_deg.clamp(0.1, 90.0) } else { 1.0 };
        Self {
            step_deg,
            tie_epsilon: tie_epsilon.max(0.0),
            reference_year,
            clear_sky: ClearSkyModel::default(),
            engine: SolarGeometryEngine::new(),
        }
    }

    pub fn step_deg(&self) -> f64 {
        self.step_deg
    }

    /// Best tilt over the whole reference year
    pub fn optimal_tilt(&self, location: &Location) -> Result<TiltAngle, ForecastError> {
        let curve = self.sweep(location)?;
        let tilt = self.select(&curve);
        info!(site = %location, tilt = %tilt, "optimal tilt computed");
        Ok(tilt)
    }

    /// Best tilt over the three months of `season`
    pub fn optimal_tilt_for_season(
        &self,
        location: &Location,
        season: Season,
    ) -> Result<TiltAngle, ForecastError> {
        let months = season.months(location);
        let grid: Vec<_> = self
            .reference_grid()
            .into_iter()
            .filter(|ts| months.contains(&ts.month()))
            .collect();
        let curve = self.score_grid(location, &grid)?;
        let tilt = self.select(&curve);
        info!(site = %location, %season, tilt = %tilt, "seasonal tilt computed");
        Ok(tilt)
    }

    /// Full (tilt, score) curve over the reference year, ascending by tilt
    pub fn sweep(&self, location: &Location) -> Result<Vec<TiltScore>, ForecastError> {
        self.score_grid(location, &self.reference_grid())
    }

    fn score_grid(
        &self,
        location: &Location,
        grid: &[DateTime<Utc>],
    ) -> Result<Vec<TiltScore>, ForecastError> {
        let positions = self.engine.positions(location, grid)?;
        let daylight: Vec<(SolarPosition, f64)> = positions
            .into_iter()
            .filter(SolarPosition::is_above_horizon)
            .map(|pos| {
                let weight = self.clear_sky.beam_transmittance(&pos);
                (pos, weight)
            })
            .collect();

        let surface_azimuth = if location.latitude() >= 0.0 { 180.0 } else { 0.0 };
        debug!(
            site = %location,
            samples = grid.len(),
            daylight = daylight.len(),
            surface_azimuth,
            "sweeping tilt candidates"
        );

        Ok(self
            .candidates()
            .into_par_iter()
            .map(|tilt_deg| TiltScore {
                tilt: TiltAngle::degrees(tilt_deg),
                score: daylight
                    .iter()
                    .map(|(pos, weight)| weight * pos.incidence_cosine(tilt_deg, surface_azimuth))
                    .sum(),
            })
            .collect())
    }

    /// Smallest tilt whose score is within `tie_epsilon` (relative) of the best
    fn select(&self, curve: &[TiltScore]) -> TiltAngle {
        let best = curve.iter().map(|c| c.score).fold(0.0, f64::max);
        curve
            .iter()
            .find(|c| c.score >= best * (1.0 - self.tie_epsilon))
            .map(|c| c.tilt)
            .unwrap_or(TiltAngle::FLAT)
    }

    fn candidates(&self) -> Vec<f64> {
        let count = (90.0 / self.step_deg).floor() as usize;
        let mut tilts: Vec<f64> = (0..=count).map(|i| i as f64 * self.step_deg).collect();
        if tilts.last().map_or(true, |last| *last < 90.0 - 1e-9) {
            tilts.push(90.0);
        }
        tilts
    }

    /// Mid-hour UTC instants covering the reference year
    fn reference_grid(&self) -> Vec<DateTime<Utc>> {
        let Some(start) = Utc
            .with_ymd_and_hms(self.reference_year, 1, 1, 0, 30, 0)
            .single()
        else {
            warn!(year = self.reference_year, "reference year out of range, empty grid");
            return Vec::new();
        };

        (0..)
            .map(|h| start + Duration::hours(h))
            .take_while(|ts| ts.year() == self.reference_year)
            .collect()
    }
}
