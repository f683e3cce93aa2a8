use anyhow::{Context, Result};
use chrono_tz::Tz;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::path::PathBuf;
use validator::Validate;

use crate::domain::{Location, PlantCapacity};
use crate::ml::ModelStore;
use crate::optimizer::TiltAngleOptimizer;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub site: SiteConfig,
    #[validate(nested)]
    pub plant: PlantConfig,
    #[validate(nested)]
    pub model: ModelConfig,
    #[validate(nested)]
    pub tilt: TiltConfig,
    #[validate(nested)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SiteConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// IANA zone name, e.g. "Europe/Stockholm"
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl SiteConfig {
    pub fn location(&self) -> Result<Location> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Unknown timezone {:?}: {}", self.timezone, e))?;
        Ok(Location::new(self.latitude, self.longitude)?.with_timezone(timezone))
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlantConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub capacity_mw: f64,
}

impl PlantConfig {
    pub fn capacity(&self) -> Result<PlantCapacity> {
        Ok(PlantCapacity::megawatts(self.capacity_mw)?)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModelConfig {
    #[validate(length(min = 1))]
    pub store_dir: String,
    #[validate(length(min = 1))]
    pub version: String,
}

impl ModelConfig {
    pub fn store(&self) -> ModelStore {
        ModelStore::new(&self.store_dir)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TiltConfig {
    #[validate(range(min = 0.1, max = 90.0))]
    pub step_deg: f64,
    #[validate(range(min = 0.0, max = 0.1))]
    pub tie_epsilon: f64,
    #[validate(range(min = 1900, max = 2100))]
    pub reference_year: i32,
}

impl TiltConfig {
    pub fn optimizer(&self) -> TiltAngleOptimizer {
        TiltAngleOptimizer::new(self.step_deg, self.tie_epsilon, self.reference_year)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WeatherConfig {
    #[validate(length(min = 1))]
    pub observations_path: String,
}

impl WeatherConfig {
    pub fn observations_path(&self) -> PathBuf {
        PathBuf::from(&self.observations_path)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("SPF__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().context("Failed to read configuration")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
