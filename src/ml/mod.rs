//! Machine Learning Module
//!
//! Gradient-boosted regression for normalized plant output:
//! - Boosted ensemble of smartcore regression trees
//! - Offline training with a chronological validation split
//! - Versioned parameter persistence
//! - Batch inference over feature vectors

use serde::{Deserialize, Serialize};

pub mod gbm;
pub mod model;
pub mod store;
pub mod training;

pub use gbm::*;
pub use model::*;
pub use store::*;
pub use training::*;

/// ML Model Metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    /// Identifier the parameters are stored under
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub validation_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
    pub schema_version: u32,
}

/// Validation Metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            r2,
        }
    }

    /// Check if metrics meet quality thresholds
    pub fn meets_quality_threshold(&self, max_rmse: f64, min_r2: f64) -> bool {
        self.rmse <= max_rmse && self.r2 >= min_r2
    }
}
