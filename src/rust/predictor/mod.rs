use serde::Serialize;

mod error;
mod ensemble;
mod model;
mod onnx;
mod predictor;
pub mod builder;
mod utils;

pub use error::ChurnError;
pub use ensemble::TreeEnsembleModel;
pub use model::{
    ChurnLabel, ChurnModel, FeatureImportance, ImportanceKind, ModelKind, DECISION_THRESHOLD,
};
pub use onnx::{OnnxModel, PROBABILITY_OUTPUT};
pub use predictor::ChurnPredictor;
pub use builder::{load_model, PredictorBuilder};

/// Outcome of one prediction. Created per submission and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: ChurnLabel,
    /// Probability of the churned class, in [0, 1]
    pub churn_probability: f32,
}

impl PredictionResult {
    pub fn stay_probability(&self) -> f32 {
        1.0 - self.churn_probability
    }

    /// Churn probability as a percentage with two decimals, e.g. `"73.45%"`.
    pub fn probability_percent(&self) -> String {
        format!("{:.2}%", self.churn_probability * 100.0)
    }
}

/// Information about the loaded model and the schema it is checked against
#[derive(Debug, Clone, Serialize)]
pub struct PredictorInfo {
    /// Path of the artifact the model was loaded from
    pub model_path: Option<String>,
    pub model_kind: ModelKind,
    pub num_features: usize,
    pub feature_names: Vec<String>,
    /// Whether the artifact carries split statistics for importance charts
    pub has_feature_importance: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_percent() {
        let result = PredictionResult {
            label: ChurnLabel::Churned,
            churn_probability: 0.734_5,
        };
        assert_eq!(result.probability_percent(), "73.45%");
        assert!((result.stay_probability() - 0.265_5).abs() < 1e-6);
    }
}
