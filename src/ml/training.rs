//! ML Model Training Pipeline
//!
//! Offline training of the boosted power model from historical weather and
//! realized plant output. Validation is always held out chronologically.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    BoostingParameters, GradientBoostedTrees, ModelMetadata, ModelParameters,
    PowerForecastModel, ValidationMetrics,
};
use crate::domain::{ForecastError, Location, PlantCapacity, WeatherObservation};
use crate::forecast::{feature_names, FeatureBuilder, FeatureVector, FEATURE_SCHEMA_VERSION};
use crate::geometry::SolarGeometryEngine;

/// Training Dataset
///
/// Samples are kept in chronological order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(features: Vec<FeatureVector>, targets: Vec<f64>) -> Result<Self, ForecastError> {
        if features.len() != targets.len() {
            return Err(ForecastError::Training(format!(
                "Feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            )));
        }
        if let Some((feature, target)) = features
            .iter()
            .zip(&targets)
            .find(|(_, t)| !t.is_finite())
        {
            return Err(ForecastError::Training(format!(
                "Non-finite target {} at {}",
                target, feature.timestamp
            )));
        }

        let mut samples: Vec<(FeatureVector, f64)> = features.into_iter().zip(targets).collect();
        samples.sort_by_key(|(f, _)| f.timestamp);
        let (features, targets) = samples.into_iter().unzip();

        Ok(Self { features, targets })
    }

    /// Dataset from historical observations and realized output in MW
    ///
    /// Targets are realized output as a fraction of `capacity`.
    pub fn from_history(
        location: &Location,
        observations: &[WeatherObservation],
        realized_mw: &[f64],
        capacity: PlantCapacity,
    ) -> Result<Self, ForecastError> {
        if observations.len() != realized_mw.len() {
            return Err(ForecastError::Training(format!(
                "Observation and output count mismatch: {} observations, {} outputs",
                observations.len(),
                realized_mw.len()
            )));
        }
        if observations.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        if let Some((obs, mw)) = observations
            .iter()
            .zip(realized_mw)
            .find(|(_, mw)| !mw.is_finite())
        {
            return Err(ForecastError::Training(format!(
                "Non-finite realized output {} at {}",
                mw, obs.timestamp
            )));
        }

        let timestamps: Vec<_> = observations.iter().map(|o| o.timestamp).collect();
        let positions = SolarGeometryEngine::new().positions(location, &timestamps)?;
        let features = FeatureBuilder::for_location(location).build_series(observations, &positions)?;

        let cap = capacity.as_megawatts();
        let targets = realized_mw
            .iter()
            .map(|mw| (mw / cap).clamp(0.0, 1.0))
            .collect();

        Self::new(features, targets)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split into training and validation sets
    ///
    /// Everything in the validation set is strictly later than everything in
    /// the training set; samples sharing a timestamp stay on the same side.
    pub fn split(&self, train_ratio: f64) -> Result<(TrainingDataset, TrainingDataset), ForecastError> {
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(ForecastError::Training(
                "Train ratio must be between 0 and 1".to_string(),
            ));
        }

        let mut split_idx = (self.len() as f64 * train_ratio).floor() as usize;
        while split_idx > 0
            && split_idx < self.len()
            && self.features[split_idx].timestamp == self.features[split_idx - 1].timestamp
        {
            split_idx += 1;
        }

        let train = TrainingDataset {
            features: self.features[..split_idx].to_vec(),
            targets: self.targets[..split_idx].to_vec(),
        };

        let val = TrainingDataset {
            features: self.features[split_idx..].to_vec(),
            targets: self.targets[split_idx..].to_vec(),
        };

        Ok((train, val))
    }

    fn rows(&self) -> Vec<Vec<f64>> {
        self.features.iter().map(|f| f.values.clone()).collect()
    }
}

/// Training Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    /// Maximum boosting rounds
    pub max_iterations: usize,
    pub early_stopping_patience: usize,
    pub validation_split: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iterations: 200,
            early_stopping_patience: 10,
            validation_split: 0.2,
            max_depth: 4,
            min_samples_leaf: 5,
            min_samples_split: 10,
        }
    }
}

impl TrainingConfig {
    fn boosting_parameters(&self) -> BoostingParameters {
        BoostingParameters {
            n_rounds: self.max_iterations,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            min_samples_split: self.min_samples_split,
            early_stopping_patience: self.early_stopping_patience,
        }
    }
}

/// Model Trainer
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Calculate validation metrics
    pub fn calculate_metrics(
        &self,
        predictions: &[f64],
        targets: &[f64],
    ) -> Result<ValidationMetrics, ForecastError> {
        if predictions.len() != targets.len() {
            return Err(ForecastError::Training(
                "Prediction and target count mismatch".to_string(),
            ));
        }

        if predictions.is_empty() {
            return Err(ForecastError::Training("No predictions to evaluate".to_string()));
        }

        let n = predictions.len() as f64;

        // Mean Absolute Error
        let mae: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / n;

        // Root Mean Square Error
        let rmse = super::gbm::rmse(predictions, targets);

        // Mean Absolute Percentage Error, night hours (zero output) excluded
        let daylight: Vec<(f64, f64)> = predictions
            .iter()
            .zip(targets.iter())
            .filter(|(_, t)| t.abs() > 1e-10)
            .map(|(p, t)| (*p, *t))
            .collect();
        let mape = if daylight.is_empty() {
            0.0
        } else {
            daylight
                .iter()
                .map(|(p, t)| ((p - t) / t).abs() * 100.0)
                .sum::<f64>()
                / daylight.len() as f64
        };

        // R-squared
        let mean_target: f64 = targets.iter().sum::<f64>() / n;
        let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
        let ss_res: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (t - p).powi(2))
            .sum();

        let r2 = if ss_tot.abs() < 1e-10 {
            0.0
        } else {
            1.0 - (ss_res / ss_tot)
        };

        Ok(ValidationMetrics::new(mae, rmse, mape, r2))
    }

    /// Train a boosted model and tag it with `version`
    ///
    /// Metrics are computed on the chronological validation tail; with too
    /// few samples for a split they fall back to the training set.
    pub fn train(
        &self,
        dataset: &TrainingDataset,
        version: &str,
    ) -> Result<PowerForecastModel, ForecastError> {
        if dataset.is_empty() {
            return Err(ForecastError::Training("Cannot train on empty dataset".to_string()));
        }

        let validation_split = self.config.validation_split;
        if !(0.0..1.0).contains(&validation_split) {
            return Err(ForecastError::Training(format!(
                "Validation split must be in [0, 1), got {}",
                validation_split
            )));
        }

        let (train, validation) = if validation_split == 0.0 {
            (dataset.clone(), TrainingDataset::default())
        } else {
            dataset.split(1.0 - validation_split)?
        };
        let (train, validation) = if validation_split > 0.0
            && (train.is_empty() || validation.is_empty())
        {
            warn!(
                samples = dataset.len(),
                "dataset too small for a validation split, evaluating on training data"
            );
            (dataset.clone(), TrainingDataset::default())
        } else {
            (train, validation)
        };

        let train_rows = train.rows();
        let validation_rows = validation.rows();
        let holdout = (!validation.is_empty())
            .then(|| (validation_rows.as_slice(), validation.targets.as_slice()));

        let ensemble = GradientBoostedTrees::fit(
            &train_rows,
            &train.targets,
            holdout,
            &self.config.boosting_parameters(),
        )?;

        let (eval_rows, eval_targets) = if validation.is_empty() {
            (&train_rows, &train.targets)
        } else {
            (&validation_rows, &validation.targets)
        };
        let predictions = ensemble.predict(eval_rows)?;
        let metrics = self.calculate_metrics(&predictions, eval_targets)?;

        info!(
            version,
            trees = ensemble.n_trees(),
            training_samples = train.len(),
            validation_samples = validation.len(),
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "model trained"
        );

        let metadata = ModelMetadata {
            model_id: format!("gbm_{}", uuid::Uuid::new_v4()),
            version: version.to_string(),
            trained_at: Utc::now(),
            training_samples: train.len(),
            validation_samples: validation.len(),
            validation_metrics: metrics,
            feature_names: feature_names(),
            schema_version: FEATURE_SCHEMA_VERSION,
        };

        Ok(PowerForecastModel::from_parameters(ModelParameters {
            metadata,
            ensemble,
        }))
    }
}
