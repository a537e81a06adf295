use std::sync::Arc;
use log::{error, warn};

use super::error::ChurnError;
use super::model::{ChurnLabel, ChurnModel, FeatureImportance, ImportanceKind};
use super::utils::is_probability;
use super::{PredictionResult, PredictorInfo};
use crate::features::{CustomerInput, FeatureEncoder, FeatureSchema, FeatureVector, RawCustomerInput};

/// A thread-safe churn predictor: feature encoder, schema contract and loaded model.
///
/// # Thread Safety
///
/// The model is held behind an `Arc` and never mutated after loading, so a single
/// predictor can be shared by every request handler.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use churnboard::{ChurnPredictor, RawCustomerInput};
///
/// let predictor = ChurnPredictor::builder()
///     .with_model_file("Customer_Churn_Project/xgb_model.json")?
///     .build()?;
///
/// let result = predictor.predict(&RawCustomerInput::default())?;
/// println!("{} ({})", result.label, result.probability_percent());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChurnPredictor {
    model_path: Option<String>,
    model: Arc<dyn ChurnModel>,
    schema: FeatureSchema,
    encoder: FeatureEncoder,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ChurnPredictor>();
    }
};

impl ChurnPredictor {
    /// Creates a new PredictorBuilder for fluent construction
    pub fn builder() -> super::builder::PredictorBuilder {
        super::builder::PredictorBuilder::new()
    }

    pub(crate) fn new(
        model: Arc<dyn ChurnModel>,
        schema: FeatureSchema,
        encoder: FeatureEncoder,
        model_path: Option<String>,
    ) -> Self {
        Self {
            model_path,
            model,
            schema,
            encoder,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Returns information about the loaded model
    pub fn info(&self) -> PredictorInfo {
        PredictorInfo {
            model_path: self.model_path.clone(),
            model_kind: self.model.kind(),
            num_features: self.schema.len(),
            feature_names: self.schema.columns().to_vec(),
            has_feature_importance: self.model.feature_importance(ImportanceKind::Weight).is_some(),
        }
    }

    /// Checks that the model still agrees with the schema: same feature count and,
    /// when the model records them, the same names in the same positions.
    pub(crate) fn check_contract(&self) -> Result<(), ChurnError> {
        if let Some(n) = self.model.num_features() {
            if n != self.schema.len() {
                return Err(ChurnError::ModelInferenceError(format!(
                    "Model expects {} features but the schema defines {}",
                    n,
                    self.schema.len()
                )));
            }
        }
        if let Some(names) = self.model.feature_names() {
            self.schema.check_names(names)?;
        }
        // Encoder and schema must describe the same vector
        if self.encoder.schema() != &self.schema {
            return Err(ChurnError::ModelInferenceError(format!(
                "Encoder produces {} but the schema is {}",
                self.encoder.schema(),
                self.schema
            )));
        }
        Ok(())
    }

    /// Validates, encodes and scores a raw form submission.
    ///
    /// # Errors
    /// - `ValidationError` if any field is outside its domain
    /// - `ModelInferenceError` if the schema check or the model call fails
    pub fn predict(&self, raw: &RawCustomerInput) -> Result<PredictionResult, ChurnError> {
        let input = CustomerInput::validate(raw).map_err(|e| {
            warn!("Rejected prediction input: {}", e);
            e
        })?;
        self.predict_customer(&input)
    }

    /// Scores an already validated customer.
    pub fn predict_customer(&self, input: &CustomerInput) -> Result<PredictionResult, ChurnError> {
        let features = self.encoder.encode(input);
        self.predict_vector(&features)
    }

    /// Scores an encoded feature vector after checking it against the schema.
    pub fn predict_vector(&self, features: &FeatureVector) -> Result<PredictionResult, ChurnError> {
        self.schema.check_len(features.len())?;
        self.check_contract()?;

        let [stay, churn] = self.model.predict_proba(features).map_err(|e| {
            error!("Model inference failed: {}", e);
            e
        })?;
        if !is_probability(stay) || !is_probability(churn) {
            return Err(ChurnError::ModelInferenceError(format!(
                "Model returned invalid probabilities [{}, {}]",
                stay, churn
            )));
        }

        Ok(PredictionResult {
            label: ChurnLabel::from_probability(churn),
            churn_probability: churn,
        })
    }

    /// Feature importance, most important first, limited to `top` entries.
    /// `None` when the model format carries no split statistics.
    pub fn feature_importance(&self, kind: ImportanceKind, top: usize) -> Option<Vec<FeatureImportance>> {
        self.model.feature_importance(kind).map(|mut scores| {
            scores.truncate(top);
            scores
        })
    }
}
