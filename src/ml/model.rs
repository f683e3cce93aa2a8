//! Power forecast model
//!
//! Wraps the boosted ensemble together with the metadata describing the
//! feature schema it was trained on.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GradientBoostedTrees, ModelMetadata};
use crate::domain::ForecastError;
use crate::forecast::FeatureVector;

/// Everything that is persisted for one trained model version
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelParameters {
    pub metadata: ModelMetadata,
    pub ensemble: GradientBoostedTrees,
}

/// Maps feature vectors to normalized plant output (fraction of capacity)
///
/// Parameters are read-only once loaded; share the model behind an `Arc`.
#[derive(Debug, Default)]
pub struct PowerForecastModel {
    parameters: Option<ModelParameters>,
}

impl PowerForecastModel {
    /// Model without parameters; every prediction fails with `ModelNotLoaded`
    pub fn unloaded() -> Self {
        Self { parameters: None }
    }

    pub fn from_parameters(parameters: ModelParameters) -> Self {
        Self {
            parameters: Some(parameters),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.parameters.is_some()
    }

    pub fn parameters(&self) -> Option<&ModelParameters> {
        self.parameters.as_ref()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.parameters.as_ref().map(|p| &p.metadata)
    }

    /// Batch inference, one raw fraction per input vector, in input order
    ///
    /// Output is not bounded to [0, 1]; callers scale and clamp.
    pub fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>, ForecastError> {
        let parameters = self.parameters.as_ref().ok_or(ForecastError::ModelNotLoaded)?;
        let expected = parameters.ensemble.n_features();

        if let Some(bad) = features.iter().find(|f| f.len() != expected) {
            return Err(ForecastError::FeatureShapeMismatch {
                timestamp: bad.timestamp,
                expected,
                actual: bad.len(),
            });
        }

        let rows: Vec<Vec<f64>> = features.iter().map(|f| f.values.clone()).collect();
        let output = parameters.ensemble.predict(&rows)?;
        debug!(
            model = %parameters.metadata.version,
            rows = output.len(),
            "batch inference complete"
        );
        Ok(output)
    }
}
