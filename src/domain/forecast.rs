use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::TiltAngle;

/// Predicted plant output for one hourly timestamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    /// Always within [0, plant capacity]
    pub predicted_power_mw: f64,
}

/// Energy produced over one local calendar day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailyEnergy {
    pub date: NaiveDate,
    pub energy_mwh: f64,
}

/// Result of one end-to-end run for a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRun {
    pub hourly: Vec<ForecastPoint>,
    pub daily: Vec<DailyEnergy>,
    pub optimal_tilt: TiltAngle,
}

impl ForecastRun {
    pub fn total_energy_mwh(&self) -> f64 {
        self.daily.iter().map(|d| d.energy_mwh).sum()
    }

    pub fn peak_power_mw(&self) -> f64 {
        self.hourly
            .iter()
            .map(|p| p.predicted_power_mw)
            .fold(0.0, f64::max)
    }
}
