//! Gradient-Boosted Regression Trees
//!
//! Least-squares boosting on top of SmartCore's `DecisionTreeRegressor`:
//! the ensemble starts from the mean target and every round fits a shallow
//! tree to the current residuals, added with a shrinkage factor.

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use std::fmt;
use tracing::debug;

use crate::domain::ForecastError;

type RegressionTree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Boosting hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParameters {
    /// Maximum number of boosting rounds (trees)
    pub n_rounds: usize,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
    /// Rounds without validation improvement before stopping
    pub early_stopping_patience: usize,
}

impl Default for BoostingParameters {
    fn default() -> Self {
        Self {
            n_rounds: 200,
            learning_rate: 0.1,
            max_depth: 4,
            min_samples_leaf: 5,
            min_samples_split: 10,
            early_stopping_patience: 10,
        }
    }
}

impl BoostingParameters {
    fn tree_parameters(&self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters::default()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_min_samples_split(self.min_samples_split)
    }
}

/// Trained boosted ensemble
#[derive(Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    base_score: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl fmt::Debug for GradientBoostedTrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientBoostedTrees")
            .field("base_score", &self.base_score)
            .field("learning_rate", &self.learning_rate)
            .field("n_features", &self.n_features)
            .field("n_trees", &self.trees.len())
            .finish()
    }
}

impl GradientBoostedTrees {
    /// Fit an ensemble on `x`/`y`
    ///
    /// With a validation set, boosting stops once validation RMSE has not
    /// improved for `early_stopping_patience` rounds and the ensemble is cut
    /// back to its best round.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        validation: Option<(&[Vec<f64>], &[f64])>,
        params: &BoostingParameters,
    ) -> Result<Self, ForecastError> {
        if x.is_empty() || y.is_empty() {
            return Err(ForecastError::Training("Cannot train on empty dataset".to_string()));
        }
        if x.len() != y.len() {
            return Err(ForecastError::Training(format!(
                "Feature and target count mismatch: {} features, {} targets",
                x.len(),
                y.len()
            )));
        }
        if !(params.learning_rate > 0.0 && params.learning_rate <= 1.0) {
            return Err(ForecastError::Training(format!(
                "Learning rate must be in (0, 1], got {}",
                params.learning_rate
            )));
        }

        let n_features = x[0].len();
        let x_matrix = to_matrix(x, n_features)?;
        let base_score = y.iter().sum::<f64>() / y.len() as f64;

        let mut validation_state = match validation {
            Some((vx, vy)) if !vx.is_empty() => {
                if vx.len() != vy.len() {
                    return Err(ForecastError::Training(
                        "Validation feature and target count mismatch".to_string(),
                    ));
                }
                Some((to_matrix(vx, n_features)?, vy, vec![base_score; vy.len()]))
            }
            _ => None,
        };

        let mut fitted = vec![base_score; y.len()];
        let mut trees = Vec::with_capacity(params.n_rounds);
        let mut best_rmse = f64::INFINITY;
        let mut best_len = 0;

        for round in 0..params.n_rounds {
            let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(t, f)| t - f).collect();
            let tree = RegressionTree::fit(&x_matrix, &residuals, params.tree_parameters())
                .map_err(|e| ForecastError::Training(format!("Tree fit failed: {:?}", e)))?;

            let step = predict_tree(&tree, &x_matrix)?;
            for (f, s) in fitted.iter_mut().zip(&step) {
                *f += params.learning_rate * s;
            }

            if let Some((vx, vy, v_fitted)) = validation_state.as_mut() {
                let v_step = predict_tree(&tree, &*vx)?;
                for (f, s) in v_fitted.iter_mut().zip(&v_step) {
                    *f += params.learning_rate * s;
                }
                let validation_rmse = rmse(v_fitted.as_slice(), *vy);
                trees.push(tree);

                if validation_rmse < best_rmse {
                    best_rmse = validation_rmse;
                    best_len = trees.len();
                } else if trees.len() - best_len >= params.early_stopping_patience {
                    debug!(round, best_len, best_rmse, "early stopping");
                    break;
                }
            } else {
                trees.push(tree);
                best_len = trees.len();
            }
        }

        trees.truncate(best_len);

        Ok(Self {
            base_score,
            learning_rate: params.learning_rate,
            n_features,
            trees,
        })
    }

    /// Raw (unbounded) predictions, one per row, in input order
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let x_matrix = to_matrix(x, self.n_features)?;
        let mut out = vec![self.base_score; x.len()];
        for tree in &self.trees {
            let step = predict_tree(tree, &x_matrix)?;
            for (o, s) in out.iter_mut().zip(&step) {
                *o += self.learning_rate * s;
            }
        }
        Ok(out)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }
}

fn to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<DenseMatrix<f64>, ForecastError> {
    let mut flat_data = Vec::with_capacity(rows.len() * n_features);
    for row in rows {
        if row.len() != n_features {
            return Err(ForecastError::Training(format!(
                "All feature vectors must have length {}, got {}",
                n_features,
                row.len()
            )));
        }
        flat_data.extend_from_slice(row);
    }
    DenseMatrix::new(rows.len(), n_features, flat_data, false)
        .map_err(|e| ForecastError::Training(format!("Matrix construction failed: {:?}", e)))
}

fn predict_tree(tree: &RegressionTree, x: &DenseMatrix<f64>) -> Result<Vec<f64>, ForecastError> {
    tree.predict(x)
        .map_err(|e| ForecastError::Training(format!("Tree prediction failed: {:?}", e)))
}

pub(crate) fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = predictions.len().max(1) as f64;
    (predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n)
        .sqrt()
}
