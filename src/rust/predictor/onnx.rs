use std::collections::HashMap;
use std::path::Path;
use log::{error, info};
use ndarray::Array2;
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::error::ChurnError;
use super::model::{ChurnModel, ModelKind};
use crate::features::FeatureVector;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Output name used by sklearn-onnx / onnxmltools converters for class probabilities.
pub const PROBABILITY_OUTPUT: &str = "probabilities";

/// A churn classifier exported to ONNX and executed by ONNX Runtime.
///
/// The graph is expected to:
/// - Accept one float tensor input of shape [batch_size, num_features]
/// - Produce class probabilities of shape [batch_size, 2] as a plain tensor
///   (converters must be run with ZipMap disabled)
#[derive(Debug)]
pub struct OnnxModel {
    session: Session,
    input_name: String,
    probability_output: String,
    num_features: Option<usize>,
}

impl OnnxModel {
    /// Loads an ONNX model from disk and checks its input/output structure.
    pub fn from_file<P: AsRef<Path>>(path: P, config: &RuntimeConfig) -> Result<Self, ChurnError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::DataLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let session = create_session_builder(config)?
            .commit_from_file(path)
            .map_err(|e| {
                error!("Failed to load ONNX model {:?}: {}", path, e);
                ChurnError::DataLoadError(format!("Failed to load ONNX model: {}", e))
            })?;

        let model = Self::from_session(session)?;
        info!(
            "ONNX model loaded from {:?} (input '{}', output '{}', features {:?})",
            path, model.input_name, model.probability_output, model.num_features
        );
        Ok(model)
    }

    /// Validates that the session has the expected structure
    ///
    /// # Returns
    /// * `Result<Self, ChurnError>` - the model if validation passes, or an error if:
    ///   - The model does not have exactly one input tensor
    ///   - The model has no outputs
    fn from_session(session: Session) -> Result<Self, ChurnError> {
        if session.inputs.len() != 1 {
            return Err(ChurnError::DataLoadError(format!(
                "Model must have exactly 1 input (the feature matrix), found {}",
                session.inputs.len()
            )));
        }
        let input = &session.inputs[0];
        let num_features = match &input.input_type {
            ValueType::Tensor { dimensions, .. } => dimensions
                .last()
                .copied()
                .filter(|&d| d > 0)
                .map(|d| d as usize),
            other => {
                return Err(ChurnError::DataLoadError(format!(
                    "Model input '{}' must be a tensor, found {:?}",
                    input.name, other
                )))
            }
        };

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name == PROBABILITY_OUTPUT)
            .or_else(|| session.outputs.get(1))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| ChurnError::DataLoadError("Model has no outputs".to_string()))?;

        Ok(Self {
            input_name: input.name.clone(),
            probability_output,
            num_features,
            session,
        })
    }
}

impl ChurnModel for OnnxModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Onnx
    }

    fn num_features(&self) -> Option<usize> {
        self.num_features
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 2], ChurnError> {
        let input_array = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| ChurnError::ModelInferenceError(format!("Failed to create input array: {}", e)))?;
        let input_dyn = input_array.into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input).map_err(|e| {
                ChurnError::ModelInferenceError(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ChurnError::ModelInferenceError(format!("Failed to run model: {}", e)))?;
        let probabilities = outputs[self.probability_output.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ChurnError::ModelInferenceError(format!(
                    "Output '{}' is not a float tensor (export without ZipMap): {}",
                    self.probability_output, e
                ))
            })?;

        let values: Vec<f32> = probabilities.iter().copied().collect();
        match values.as_slice() {
            [stay, churn, ..] => Ok([*stay, *churn]),
            [churn] => Ok([1.0 - *churn, *churn]),
            [] => Err(ChurnError::ModelInferenceError(
                "Model returned no probabilities".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // Logistic fixtures: sigmoid(0.05 * Age - IsActiveMember - 2)
    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    fn features(age: f32, active: f32) -> FeatureVector {
        let mut values = vec![0.0; 14];
        values[2] = age;
        values[7] = active;
        FeatureVector::from_values(values)
    }

    #[test]
    fn test_session_structure_is_read() {
        let model = OnnxModel::from_file(fixture("churn_logistic.onnx"), &RuntimeConfig::default()).unwrap();
        assert_eq!(model.input_name, "input");
        assert_eq!(model.probability_output, PROBABILITY_OUTPUT);
        assert_eq!(model.num_features(), Some(14));
        assert_eq!(model.kind(), ModelKind::Onnx);
    }

    #[test]
    fn test_two_column_probabilities() {
        let model = OnnxModel::from_file(fixture("churn_logistic.onnx"), &RuntimeConfig::default()).unwrap();
        let [stay, churn] = model.predict_proba(&features(60.0, 0.0)).unwrap();
        let expected = 1.0 / (1.0 + (-1.0f32).exp());
        assert!((churn - expected).abs() < 1e-5);
        assert!((stay + churn - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_single_column_output_is_the_churn_probability() {
        let model =
            OnnxModel::from_file(fixture("churn_single_output.onnx"), &RuntimeConfig::default()).unwrap();
        assert_eq!(model.probability_output, "churn");
        let [stay, churn] = model.predict_proba(&features(40.0, 1.0)).unwrap();
        let expected = 1.0 / (1.0 + 1.0f32.exp());
        assert!((churn - expected).abs() < 1e-5);
        assert!((stay - (1.0 - expected)).abs() < 1e-5);
    }

    #[test]
    fn test_feature_count_comes_from_input_shape() {
        let model =
            OnnxModel::from_file(fixture("churn_13_features.onnx"), &RuntimeConfig::default()).unwrap();
        assert_eq!(model.num_features(), Some(13));
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let result = OnnxModel::from_file("/nonexistent/xgb_model.onnx", &RuntimeConfig::default());
        assert!(matches!(result, Err(ChurnError::DataLoadError(_))));
    }

    #[test]
    fn test_corrupt_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgb_model.onnx");
        std::fs::write(&path, "corrupted data").unwrap();
        let result = OnnxModel::from_file(&path, &RuntimeConfig::default());
        assert!(matches!(result, Err(ChurnError::DataLoadError(_))));
    }
}
