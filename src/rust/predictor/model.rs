use std::fmt;
use serde::Serialize;

use super::error::ChurnError;
use crate::features::FeatureVector;

/// Probability at or above which a customer is labelled as churned.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Discrete outcome of a prediction. Class 0 is Stayed, class 1 is Churned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChurnLabel {
    Stayed,
    Churned,
}

impl ChurnLabel {
    pub fn from_probability(churn_probability: f32) -> Self {
        if churn_probability >= DECISION_THRESHOLD {
            ChurnLabel::Churned
        } else {
            ChurnLabel::Stayed
        }
    }

    pub fn class(&self) -> u8 {
        match self {
            ChurnLabel::Stayed => 0,
            ChurnLabel::Churned => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnLabel::Stayed => "Stayed",
            ChurnLabel::Churned => "Churned",
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How feature importance is measured on a tree ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportanceKind {
    /// Mean loss reduction of the splits that use the feature
    #[default]
    Gain,
    /// Summed loss reduction of the splits that use the feature
    TotalGain,
    /// Number of splits that use the feature
    Weight,
}

impl ImportanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportanceKind::Gain => "gain",
            ImportanceKind::TotalGain => "total_gain",
            ImportanceKind::Weight => "weight",
        }
    }
}

impl std::str::FromStr for ImportanceKind {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gain" => Ok(ImportanceKind::Gain),
            "total_gain" => Ok(ImportanceKind::TotalGain),
            "weight" => Ok(ImportanceKind::Weight),
            _ => Err(ChurnError::ValidationError(format!(
                "Importance type '{}' is not one of gain, total_gain, weight",
                s
            ))),
        }
    }
}

/// Importance score of a single feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub score: f64,
}

/// The format a model artifact was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    Onnx,
    XgboostJson,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Onnx => f.write_str("onnx"),
            ModelKind::XgboostJson => f.write_str("xgboost-json"),
        }
    }
}

/// A loaded binary churn classifier.
///
/// Implementations are immutable after loading so one instance can serve
/// every request handler.
pub trait ChurnModel: fmt::Debug + Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Number of input features the artifact declares, if it declares one
    fn num_features(&self) -> Option<usize>;

    /// Training column names recorded in the artifact, if any
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Returns `[P(stay), P(churn)]`
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 2], ChurnError>;

    fn predict(&self, features: &FeatureVector) -> Result<ChurnLabel, ChurnError> {
        let [_, churn] = self.predict_proba(features)?;
        Ok(ChurnLabel::from_probability(churn))
    }

    /// Importance scores sorted from most to least important, when the artifact
    /// carries the statistics to compute them
    fn feature_importance(&self, _kind: ImportanceKind) -> Option<Vec<FeatureImportance>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_threshold() {
        assert_eq!(ChurnLabel::from_probability(0.49), ChurnLabel::Stayed);
        assert_eq!(ChurnLabel::from_probability(0.5), ChurnLabel::Churned);
        assert_eq!(ChurnLabel::Stayed.class(), 0);
        assert_eq!(ChurnLabel::Churned.class(), 1);
    }

    #[test]
    fn test_importance_kind_parsing() {
        assert_eq!("GAIN".parse::<ImportanceKind>().unwrap(), ImportanceKind::Gain);
        assert_eq!("weight".parse::<ImportanceKind>().unwrap(), ImportanceKind::Weight);
        assert!("cover".parse::<ImportanceKind>().is_err());
    }
}
