use ort::Error as OrtError;
use polars::prelude::PolarsError;
use std::fmt;

use crate::artifact_manager::ArtifactError;

/// Represents the different types of errors that can occur between a form submission
/// and a churn verdict.
#[derive(Debug)]
pub enum ChurnError {
    /// An input field is outside its allowed domain
    ValidationError(String),
    /// The feature vector is malformed for the model, or the model call failed
    ModelInferenceError(String),
    /// The dataset or model artifact is missing or corrupt
    DataLoadError(String),
}

impl fmt::Display for ChurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::ModelInferenceError(msg) => write!(f, "Model inference error: {}", msg),
            Self::DataLoadError(msg) => write!(f, "Data load error: {}", msg),
        }
    }
}

impl std::error::Error for ChurnError {}

impl From<OrtError> for ChurnError {
    fn from(err: OrtError) -> Self {
        ChurnError::DataLoadError(err.to_string())
    }
}

impl From<ArtifactError> for ChurnError {
    fn from(err: ArtifactError) -> Self {
        ChurnError::DataLoadError(err.to_string())
    }
}

impl From<PolarsError> for ChurnError {
    fn from(err: PolarsError) -> Self {
        ChurnError::DataLoadError(err.to_string())
    }
}
