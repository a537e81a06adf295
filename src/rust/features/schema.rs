use std::fmt;

use crate::predictor::ChurnError;

/// Column names of the feature vector, in the order the classifier was trained on.
pub const CHURN_FEATURES: [&str; 14] = [
    "CreditScore",
    "Gender",
    "Age",
    "Tenure",
    "Balance",
    "NumOfProducts",
    "HasCrCard",
    "IsActiveMember",
    "EstimatedSalary",
    "Geography_Germany",
    "Geography_Spain",
    "AgeGroup_Adult",
    "AgeGroup_Senior",
    "EngagedCustomer",
];

/// Named, ordered description of the vector a model consumes.
///
/// Positional agreement between encoder and model is never assumed: the predictor
/// checks a model against its schema when it is built and again before every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::churn()
    }
}

impl FeatureSchema {
    /// The 14-column schema used by the churn classifier.
    pub fn churn() -> Self {
        Self::new(CHURN_FEATURES.iter().map(|c| c.to_string()).collect())
    }

    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Checks a vector length against the schema.
    pub fn check_len(&self, len: usize) -> Result<(), ChurnError> {
        if len != self.len() {
            return Err(ChurnError::ModelInferenceError(format!(
                "Feature vector has {} values but the schema defines {} columns",
                len,
                self.len()
            )));
        }
        Ok(())
    }

    /// Checks the feature names a model was trained with against the schema,
    /// position by position.
    pub fn check_names(&self, model_names: &[String]) -> Result<(), ChurnError> {
        self.check_len(model_names.len()).map_err(|_| {
            ChurnError::ModelInferenceError(format!(
                "Model expects {} features but the schema defines {}",
                model_names.len(),
                self.len()
            ))
        })?;

        if let Some((pos, (expected, actual))) = self
            .columns
            .iter()
            .zip(model_names)
            .enumerate()
            .find(|(_, (expected, actual))| expected != actual)
        {
            return Err(ChurnError::ModelInferenceError(format!(
                "Feature {} is '{}' in the model but '{}' in the schema",
                pos, actual, expected
            )));
        }
        Ok(())
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.columns.join(", "))
    }
}
