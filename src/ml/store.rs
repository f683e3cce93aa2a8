//! Model persistence
//!
//! Parameters are bincode-encoded and stored as `<root>/<version>.bin`.
//! Encoding is lossless, so a loaded model predicts bit-for-bit like the one
//! that was saved.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{ModelParameters, PowerForecastModel};
use crate::domain::ForecastError;
use crate::forecast::{FEATURE_NAMES, FEATURE_SCHEMA_VERSION};

const MODEL_EXTENSION: &str = "bin";

/// Serialize model parameters to bytes
pub fn to_bytes(parameters: &ModelParameters) -> Result<Vec<u8>, ForecastError> {
    bincode::serialize(parameters)
        .map_err(|e| ForecastError::Persistence(format!("Failed to serialize model: {}", e)))
}

/// Restore model parameters from bytes
pub fn from_bytes(bytes: &[u8]) -> Result<ModelParameters, ForecastError> {
    bincode::deserialize(bytes)
        .map_err(|e| ForecastError::Persistence(format!("Failed to deserialize model: {}", e)))
}

/// Directory of model versions
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, version: &str) -> Result<PathBuf, ForecastError> {
        validate_version(version)?;
        Ok(self.root.join(format!("{}.{}", version, MODEL_EXTENSION)))
    }

    /// Persist a loaded model under its metadata version
    pub fn save(&self, model: &PowerForecastModel) -> Result<PathBuf, ForecastError> {
        let parameters = model.parameters().ok_or(ForecastError::ModelNotLoaded)?;
        let path = self.path_for(&parameters.metadata.version)?;

        fs::create_dir_all(&self.root).map_err(|e| {
            ForecastError::Persistence(format!("Cannot create {}: {}", self.root.display(), e))
        })?;
        fs::write(&path, to_bytes(parameters)?).map_err(|e| {
            ForecastError::Persistence(format!("Cannot write {}: {}", path.display(), e))
        })?;

        info!(version = %parameters.metadata.version, path = %path.display(), "model saved");
        Ok(path)
    }

    /// Load a model version, refusing parameters trained on another schema
    pub fn load(&self, version: &str) -> Result<PowerForecastModel, ForecastError> {
        let path = self.path_for(version)?;
        let bytes = fs::read(&path).map_err(|e| {
            ForecastError::Persistence(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let parameters = from_bytes(&bytes)?;
        ensure_current_schema(&parameters)?;

        info!(
            version,
            model_id = %parameters.metadata.model_id,
            trees = parameters.ensemble.n_trees(),
            "model loaded"
        );
        Ok(PowerForecastModel::from_parameters(parameters))
    }

    /// Stored versions, sorted
    pub fn list_versions(&self) -> Result<Vec<String>, ForecastError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ForecastError::Persistence(format!(
                    "Cannot list {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut versions: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(MODEL_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        versions.sort();
        Ok(versions)
    }
}

fn validate_version(version: &str) -> Result<(), ForecastError> {
    let valid = !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !version.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(ForecastError::Persistence(format!(
            "Invalid model version identifier: {:?}",
            version
        )))
    }
}

fn ensure_current_schema(parameters: &ModelParameters) -> Result<(), ForecastError> {
    let metadata = &parameters.metadata;
    let names_match = metadata.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES);
    if metadata.schema_version != FEATURE_SCHEMA_VERSION
        || !names_match
        || parameters.ensemble.n_features() != FEATURE_NAMES.len()
    {
        return Err(ForecastError::Persistence(format!(
            "Model {} was trained on feature schema v{}, current schema is v{}",
            metadata.version, metadata.schema_version, FEATURE_SCHEMA_VERSION
        )));
    }
    Ok(())
}
