use std::path::Path;
use std::sync::Arc;
use log::{error, info};

use super::ensemble::TreeEnsembleModel;
use super::error::ChurnError;
use super::model::ChurnModel;
use super::onnx::OnnxModel;
use super::predictor::ChurnPredictor;
use crate::artifact_manager::ArtifactError;
use crate::features::{FeatureEncoder, FeatureSchema};
use crate::runtime::RuntimeConfig;

/// Loads a model artifact, picking the backend from the file extension:
/// `.onnx` runs through ONNX Runtime, `.json` is read as an XGBoost model dump.
pub fn load_model<P: AsRef<Path>>(
    path: P,
    config: &RuntimeConfig,
) -> Result<Arc<dyn ChurnModel>, ChurnError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("onnx") => Ok(Arc::new(OnnxModel::from_file(path, config)?)),
        Some("json") => Ok(Arc::new(TreeEnsembleModel::from_json_file(path)?)),
        _ => Err(ArtifactError::Unsupported(format!(
            "model file {} (expected .onnx or .json)",
            path.display()
        ))
        .into()),
    }
}

/// A builder for constructing a ChurnPredictor with a fluent interface.
#[derive(Default, Debug)]
pub struct PredictorBuilder {
    model_path: Option<String>,
    model: Option<Arc<dyn ChurnModel>>,
    schema: FeatureSchema,
    runtime_config: RuntimeConfig,
}

impl PredictorBuilder {
    /// Creates a builder with the churn feature schema and default runtime settings
    pub fn new() -> Self {
        Self {
            model_path: None,
            model: None,
            schema: FeatureSchema::churn(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the ONNX Runtime configuration. Only used by `.onnx` models and must be
    /// called before `with_model_file`.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Replaces the feature schema the model is checked against
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Loads the model from an artifact on disk
    ///
    /// # Returns
    /// * `Result<Self, ChurnError>` - The builder instance if successful, or a
    ///   `DataLoadError` if:
    ///   - A model is already set
    ///   - The path is empty or the file doesn't exist
    ///   - The artifact format is unsupported or the file is corrupt
    pub fn with_model_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ChurnError> {
        let path = path.as_ref();
        if self.model.is_some() {
            return Err(ChurnError::DataLoadError("Model already set".to_string()));
        }
        if path.as_os_str().is_empty() {
            return Err(ChurnError::DataLoadError("Model path cannot be empty".to_string()));
        }

        let model = load_model(path, &self.runtime_config).map_err(|e| {
            error!("Failed to load model {:?}: {}", path, e);
            e
        })?;
        info!("Model loaded successfully ({})", model.kind());

        self.model_path = Some(path.display().to_string());
        self.model = Some(model);
        Ok(self)
    }

    /// Uses an already loaded model
    pub fn with_model(mut self, model: Arc<dyn ChurnModel>) -> Result<Self, ChurnError> {
        if self.model.is_some() {
            return Err(ChurnError::DataLoadError("Model already set".to_string()));
        }
        self.model = Some(model);
        Ok(self)
    }

    /// Builds the predictor after checking the model against the schema
    ///
    /// # Returns
    /// * `Result<ChurnPredictor, ChurnError>` - The predictor, or an error if:
    ///   - No model is set (`DataLoadError`)
    ///   - The schema is empty (`ModelInferenceError`)
    ///   - The model's feature count or feature names disagree with the schema
    ///     (`ModelInferenceError`)
    pub fn build(self) -> Result<ChurnPredictor, ChurnError> {
        let model = self
            .model
            .ok_or_else(|| ChurnError::DataLoadError("A model must be set".to_string()))?;
        if self.schema.is_empty() {
            return Err(ChurnError::ModelInferenceError("Feature schema is empty".to_string()));
        }

        let predictor = ChurnPredictor::new(model, self.schema, FeatureEncoder::new(), self.model_path);
        predictor.check_contract()?;
        info!("Model validated against feature schema {}", predictor.schema());
        Ok(predictor)
    }
}
