use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use super::{daily_rollup, hourly_profile, FeatureBuilder, WeatherDataAdapter};
use crate::domain::{
    DailyEnergy, ForecastError, ForecastPoint, ForecastRun, Location, PlantCapacity, TiltAngle,
    WeatherObservation,
};
use crate::geometry::SolarGeometryEngine;
use crate::ml::PowerForecastModel;
use crate::optimizer::TiltAngleOptimizer;

/// Runs geometry, feature construction and inference for a site
///
/// Holds no per-call state; one orchestrator can serve concurrent callers.
pub struct ForecastOrchestrator {
    model: Arc<PowerForecastModel>,
    geometry: SolarGeometryEngine,
    tilt_optimizer: TiltAngleOptimizer,
}

impl ForecastOrchestrator {
    pub fn new(model: Arc<PowerForecastModel>) -> Self {
        Self {
            model,
            geometry: SolarGeometryEngine::new(),
            tilt_optimizer: TiltAngleOptimizer::default(),
        }
    }

    pub fn with_tilt_optimizer(mut self, tilt_optimizer: TiltAngleOptimizer) -> Self {
        self.tilt_optimizer = tilt_optimizer;
        self
    }

    pub fn model(&self) -> &Arc<PowerForecastModel> {
        &self.model
    }

    /// Hourly power forecast, one point per observation, in input order
    ///
    /// Output is zero whenever the sun is at or below the horizon and is
    /// otherwise clamped to [0, capacity]. The first failing observation
    /// aborts the whole call.
    pub fn forecast(
        &self,
        location: &Location,
        capacity: PlantCapacity,
        weather: &[WeatherObservation],
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        if weather.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        if !self.model.is_loaded() {
            return Err(ForecastError::ModelNotLoaded);
        }

        let timestamps: Vec<_> = weather.iter().map(|o| o.timestamp).collect();
        let positions = self.geometry.positions(location, &timestamps)?;
        debug!(site = %location, count = positions.len(), "solar positions computed");

        let features = FeatureBuilder::for_location(location).build_series(weather, &positions)?;
        debug!(count = features.len(), "features built");

        let fractions = self.model.predict(&features)?;

        let points: Vec<ForecastPoint> = positions
            .iter()
            .zip(fractions)
            .map(|(pos, fraction)| ForecastPoint {
                timestamp: pos.timestamp,
                predicted_power_mw: if pos.is_above_horizon() {
                    capacity.scale(fraction)
                } else {
                    0.0
                },
            })
            .collect();

        info!(
            site = %location,
            capacity = %capacity,
            points = points.len(),
            "forecast complete"
        );
        Ok(points)
    }

    /// Daily energy by calendar day in the site's timezone
    pub fn daily_rollup(&self, location: &Location, points: &[ForecastPoint]) -> Vec<DailyEnergy> {
        daily_rollup(points, location.timezone())
    }

    /// Mean power by local hour of day
    pub fn hourly_profile(&self, location: &Location, points: &[ForecastPoint]) -> [f64; 24] {
        hourly_profile(points, location.timezone())
    }

    pub fn optimal_tilt(&self, location: &Location) -> Result<TiltAngle, ForecastError> {
        self.tilt_optimizer.optimal_tilt(location)
    }

    /// Fetch weather through `adapter`, then forecast, roll up and compute
    /// the optimal tilt
    pub async fn run(
        &self,
        adapter: &dyn WeatherDataAdapter,
        location: &Location,
        capacity: PlantCapacity,
    ) -> Result<ForecastRun> {
        let weather = adapter
            .fetch(location)
            .await
            .with_context(|| format!("Weather fetch failed for {}", location))?;

        let hourly = self.forecast(location, capacity, &weather)?;
        let daily = self.daily_rollup(location, &hourly);

        let optimizer = self.tilt_optimizer.clone();
        let site = *location;
        let optimal_tilt = tokio::task::spawn_blocking(move || optimizer.optimal_tilt(&site))
            .await
            .context("Tilt optimization task failed")??;

        info!(
            site = %location,
            days = daily.len(),
            tilt = %optimal_tilt,
            "forecast run complete"
        );
        Ok(ForecastRun {
            hourly,
            daily,
            optimal_tilt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{StaticWeatherSource, FEATURE_COUNT};
    use crate::ml::{
        BoostingParameters, GradientBoostedTrees, ModelMetadata, ModelParameters,
        ValidationMetrics,
    };
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    /// Model whose output tracks the elevation feature, overshooting 1.0 near noon
    fn elevation_model() -> Arc<PowerForecastModel> {
        let elevation_idx = 10;
        let x: Vec<Vec<f64>> = (-30..=90)
            .map(|e| {
                let mut row = vec![0.0; FEATURE_COUNT];
                row[elevation_idx] = e as f64;
                row
            })
            .collect();
        let y: Vec<f64> = (-30..=90).map(|e| e as f64 / 50.0).collect();
        let params = BoostingParameters {
            n_rounds: 40,
            learning_rate: 0.3,
            min_samples_leaf: 1,
            min_samples_split: 2,
            ..BoostingParameters::default()
        };
        Arc::new(PowerForecastModel::from_parameters(ModelParameters {
            metadata: ModelMetadata {
                model_id: "elevation".to_string(),
                version: "test".to_string(),
                trained_at: Utc::now(),
                training_samples: x.len(),
                validation_samples: 0,
                validation_metrics: ValidationMetrics::new(0.0, 0.0, 0.0, 1.0),
                feature_names: crate::forecast::feature_names(),
                schema_version: crate::forecast::FEATURE_SCHEMA_VERSION,
            },
            ensemble: GradientBoostedTrees::fit(&x, &y, None, &params).unwrap(),
        }))
    }

    fn phoenix() -> Location {
        Location::new(33.45, -112.07)
            .unwrap()
            .with_timezone(chrono_tz::America::Phoenix)
    }

    fn two_days() -> Vec<WeatherObservation> {
        let start = Utc.with_ymd_and_hms(2024, 6, 21, 7, 0, 0).unwrap();
        (0..48)
            .map(|h| WeatherObservation::new(start + Duration::hours(h), 30.0, 0.1, 0.2, 2.0))
            .collect()
    }

    #[test]
    fn test_forecast_preserves_length_and_order() {
        let orchestrator = ForecastOrchestrator::new(elevation_model());
        let weather = two_days();
        let capacity = PlantCapacity::megawatts(80.0).unwrap();

        let points = orchestrator.forecast(&phoenix(), capacity, &weather).unwrap();
        assert_eq!(points.len(), weather.len());
        for (point, obs) in points.iter().zip(&weather) {
            assert_eq!(point.timestamp, obs.timestamp);
        }
    }

    #[test]
    fn test_night_is_zero_and_noon_is_capped() {
        let orchestrator = ForecastOrchestrator::new(elevation_model());
        let location = phoenix();
        let capacity = PlantCapacity::megawatts(80.0).unwrap();
        let weather = two_days();

        let points = orchestrator.forecast(&location, capacity, &weather).unwrap();
        let engine = SolarGeometryEngine::new();
        for point in &points {
            let elevation = engine.position(&location, point.timestamp).unwrap().elevation_deg;
            if elevation <= 0.0 {
                assert_eq!(point.predicted_power_mw, 0.0);
            }
            assert!((0.0..=80.0).contains(&point.predicted_power_mw));
        }
        // Near solar noon the raw fraction exceeds 1.0
        let peak = points.iter().map(|p| p.predicted_power_mw).fold(0.0, f64::max);
        assert_eq!(peak, 80.0);
    }

    #[test]
    fn test_empty_series() {
        let orchestrator = ForecastOrchestrator::new(elevation_model());
        let capacity = PlantCapacity::megawatts(80.0).unwrap();
        assert_eq!(
            orchestrator.forecast(&phoenix(), capacity, &[]).unwrap_err(),
            ForecastError::EmptySeries
        );
    }

    #[test]
    fn test_unloaded_model() {
        let orchestrator = ForecastOrchestrator::new(Arc::new(PowerForecastModel::unloaded()));
        let capacity = PlantCapacity::megawatts(80.0).unwrap();
        assert_eq!(
            orchestrator.forecast(&phoenix(), capacity, &two_days()).unwrap_err(),
            ForecastError::ModelNotLoaded
        );
    }

    #[test]
    fn test_incomplete_observation_aborts() {
        let orchestrator = ForecastOrchestrator::new(elevation_model());
        let capacity = PlantCapacity::megawatts(80.0).unwrap();
        let mut weather = two_days();
        weather[5].cloud_cover_fraction = None;

        assert_eq!(
            orchestrator.forecast(&phoenix(), capacity, &weather).unwrap_err(),
            ForecastError::IncompleteObservation {
                timestamp: weather[5].timestamp,
                field: "cloud_cover_fraction",
            }
        );
    }

    #[test]
    fn test_daily_rollup_uses_site_timezone() {
        let orchestrator = ForecastOrchestrator::new(elevation_model());
        let location = phoenix();
        let capacity = PlantCapacity::megawatts(80.0).unwrap();
        let points = orchestrator.forecast(&location, capacity, &two_days()).unwrap();

        // 07:00 UTC is midnight in Phoenix, so 48 hours are exactly two local days
        let daily = orchestrator.daily_rollup(&location, &points);
        assert_eq!(daily.len(), 2);
        let total: f64 = points.iter().map(|p| p.predicted_power_mw).sum();
        assert!((daily.iter().map(|d| d.energy_mwh).sum::<f64>() - total).abs() < 1e-9);

        let profile = orchestrator.hourly_profile(&location, &points);
        assert_eq!(profile[0], 0.0);
        assert!(profile[12] > profile[8]);
    }

    #[tokio::test]
    async fn test_run_composes_forecast_rollup_and_tilt() {
        let orchestrator = ForecastOrchestrator::new(elevation_model())
            .with_tilt_optimizer(TiltAngleOptimizer::new(5.0, 1e-4, 2023));
        let source = StaticWeatherSource::new(two_days());
        let capacity = PlantCapacity::megawatts(80.0).unwrap();

        let run = orchestrator.run(&source, &phoenix(), capacity).await.unwrap();
        assert_eq!(run.hourly.len(), 48);
        assert_eq!(run.daily.len(), 2);
        assert!(run.optimal_tilt.as_degrees() > 15.0 && run.optimal_tilt.as_degrees() < 40.0);
    }

    #[tokio::test]
    async fn test_run_surfaces_forecast_errors() {
        let orchestrator = ForecastOrchestrator::new(elevation_model());
        let source = StaticWeatherSource::default();
        let capacity = PlantCapacity::megawatts(80.0).unwrap();

        let err = orchestrator.run(&source, &phoenix(), capacity).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ForecastError>(), Some(&ForecastError::EmptySeries));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_predictions_within_capacity(
            capacity_mw in 0.5f64..500.0,
            temps in prop::collection::vec(-20.0f64..45.0, 1..48),
        ) {
            let orchestrator = ForecastOrchestrator::new(elevation_model());
            let capacity = PlantCapacity::megawatts(capacity_mw).unwrap();
            let start = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
            let weather: Vec<_> = temps
                .iter()
                .enumerate()
                .map(|(i, t)| WeatherObservation::new(start + Duration::hours(i as i64), *t, 0.5, 0.5, 1.0))
                .collect();

            let points = orchestrator.forecast(&phoenix(), capacity, &weather).unwrap();
            prop_assert_eq!(points.len(), weather.len());
            for p in points {
                prop_assert!(p.predicted_power_mw >= 0.0 && p.predicted_power_mw <= capacity_mw);
            }
        }
    }
}
