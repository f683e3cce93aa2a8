//! # Clear-Sky Radiation
//!
//! Simplified clear-sky model: relative air mass from the solar zenith
//! angle, beam transmittance through a clear atmosphere, and the resulting
//! irradiance on a horizontal surface.

use serde::{Deserialize, Serialize};

use super::SolarPosition;

/// Energy at the top of the atmosphere (W/m²)
pub const SOLAR_CONSTANT_W_M2: f64 = 1367.0;

/// Clear-sky radiation model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClearSkyModel {
    /// Typical clear-sky atmospheric transmission at air mass 1
    pub transmission: f64,
}

impl Default for ClearSkyModel {
    fn default() -> Self {
        Self { transmission: 0.7 }
    }
}

impl ClearSkyModel {
    /// Relative optical air mass (Kasten-Young), `None` below the horizon
    pub fn air_mass(&self, position: &SolarPosition) -> Option<f64> {
        if !position.is_above_horizon() {
            return None;
        }
        let zenith = position.zenith_deg;
        Some(1.0 / (zenith.to_radians().cos() + 0.50572 * (96.07995 - zenith).powf(-1.6364)))
    }

    /// Fraction of the beam that survives the atmosphere (0.0-1.0)
    pub fn beam_transmittance(&self, position: &SolarPosition) -> f64 {
        match self.air_mass(position) {
            Some(am) => self.transmission.powf(am.powf(0.678)),
            None => 0.0,
        }
    }

    /// Clear-sky irradiance on a horizontal surface (W/m²)
    pub fn horizontal_irradiance(&self, position: &SolarPosition) -> f64 {
        if !position.is_above_horizon() {
            return 0.0;
        }
        SOLAR_CONSTANT_W_M2
            * self.beam_transmittance(position)
            * position.elevation_deg.to_radians().sin()
    }
}
