//! Weather data sources
//!
//! A `WeatherDataAdapter` hands the orchestrator the hourly observation
//! series for a site. Credentials and transport belong to the adapter; the
//! forecasting core only sees `WeatherObservation`s.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::domain::{Location, WeatherObservation};

#[async_trait]
pub trait WeatherDataAdapter: Send + Sync {
    /// Hourly observations for the site, in chronological order
    async fn fetch(&self, location: &Location) -> Result<Vec<WeatherObservation>>;
}

/// In-memory series, returned as-is for any site
#[derive(Debug, Clone, Default)]
pub struct StaticWeatherSource {
    observations: Vec<WeatherObservation>,
}

impl StaticWeatherSource {
    pub fn new(observations: Vec<WeatherObservation>) -> Self {
        Self { observations }
    }
}

#[async_trait]
impl WeatherDataAdapter for StaticWeatherSource {
    async fn fetch(&self, location: &Location) -> Result<Vec<WeatherObservation>> {
        debug!(site = %location, count = self.observations.len(), "serving static weather");
        Ok(self.observations.clone())
    }
}

/// Reads a JSON array of observations from disk on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileWeatherSource {
    path: PathBuf,
}

impl JsonFileWeatherSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WeatherDataAdapter for JsonFileWeatherSource {
    async fn fetch(&self, location: &Location) -> Result<Vec<WeatherObservation>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read weather file {}", self.path.display()))?;

        let mut observations: Vec<WeatherObservation> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse weather file {}", self.path.display()))?;
        observations.sort_by_key(|o| o.timestamp);

        info!(
            site = %location,
            path = %self.path.display(),
            count = observations.len(),
            "loaded weather observations"
        );
        Ok(observations)
    }
}
