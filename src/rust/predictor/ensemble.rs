//! Native evaluation of gradient-boosted trees saved with XGBoost's `save_model` JSON format.
//!
//! Only the parts of the document needed for binary classification are read:
//! the tree arrays, the base score, the objective and the recorded feature names.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use log::info;
use serde::Deserialize;

use super::error::ChurnError;
use super::model::{ChurnModel, FeatureImportance, ImportanceKind, ModelKind};
use super::utils::{logit, sigmoid};
use crate::artifact_manager::ArtifactError;
use crate::features::FeatureVector;

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: XgbGradientBooster,
    learner_model_param: XgbLearnerModelParam,
    objective: XgbObjective,
}

#[derive(Debug, Deserialize)]
struct XgbGradientBooster {
    name: String,
    model: Option<XgbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct XgbTreeModel {
    trees: Vec<XgbTree>,
    #[serde(default)]
    tree_info: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct XgbTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    loss_changes: Vec<f32>,
}

/// Older writers emit `default_left` as 0/1, newer ones as booleans.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct XgbLearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XgbObjective {
    name: String,
}

const LEAF: i64 = -1;

/// One regression tree in flattened array form.
#[derive(Debug, Clone)]
struct Tree {
    left: Vec<i64>,
    right: Vec<i64>,
    split_index: Vec<usize>,
    split_condition: Vec<f32>,
    default_left: Vec<bool>,
    loss_change: Vec<f32>,
}

impl Tree {
    fn from_xgb(tree: XgbTree, tree_id: usize, num_features: usize) -> Result<Self, ArtifactError> {
        let n = tree.left_children.len();
        let lengths = [
            tree.right_children.len(),
            tree.split_indices.len(),
            tree.split_conditions.len(),
            tree.default_left.len(),
        ];
        if n == 0 || lengths.iter().any(|&len| len != n) {
            return Err(ArtifactError::Parse(format!(
                "tree {} has inconsistent node arrays",
                tree_id
            )));
        }

        for node in 0..n {
            let (left, right) = (tree.left_children[node], tree.right_children[node]);
            if left == LEAF {
                continue;
            }
            // Children are always stored after their parent, which also rules out cycles.
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(ArtifactError::Parse(format!(
                    "tree {} node {} has invalid children ({}, {})",
                    tree_id, node, left, right
                )));
            }
            if tree.split_indices[node] as usize >= num_features {
                return Err(ArtifactError::Parse(format!(
                    "tree {} node {} splits on feature {} but the model has {} features",
                    tree_id, node, tree.split_indices[node], num_features
                )));
            }
        }

        let loss_change = if tree.loss_changes.len() == n {
            tree.loss_changes
        } else {
            vec![0.0; n]
        };

        Ok(Self {
            left: tree.left_children,
            right: tree.right_children,
            split_index: tree.split_indices.into_iter().map(|i| i as usize).collect(),
            split_condition: tree.split_conditions,
            default_left: tree.default_left.into_iter().map(Flag::is_set).collect(),
            loss_change,
        })
    }

    /// Walks from the root to a leaf. A value goes left when it is below the
    /// split condition; missing values follow the node's default direction.
    fn leaf_value(&self, features: &[f32]) -> f32 {
        let mut node = 0usize;
        loop {
            let left = self.left[node];
            if left == LEAF {
                return self.split_condition[node];
            }
            let value = features
                .get(self.split_index[node])
                .copied()
                .unwrap_or(f32::NAN);
            let go_left = if value.is_nan() {
                self.default_left[node]
            } else {
                value < self.split_condition[node]
            };
            let next = if go_left { left } else { self.right[node] };
            node = next as usize;
        }
    }

    fn splits(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        (0..self.left.len())
            .filter(move |&node| self.left[node] != LEAF)
            .map(move |node| (self.split_index[node], self.loss_change[node]))
    }
}

/// A binary `binary:logistic` tree ensemble.
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    trees: Vec<Tree>,
    base_margin: f32,
    num_features: usize,
    feature_names: Option<Vec<String>>,
}

impl TreeEnsembleModel {
    /// Loads an XGBoost JSON model from disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        let model = Self::from_json_str(&text)?;
        info!(
            "Loaded tree ensemble from {:?}: {} trees, {} features",
            path,
            model.trees.len(),
            model.num_features
        );
        Ok(model)
    }

    /// Parses an XGBoost JSON model document.
    pub fn from_json_str(text: &str) -> Result<Self, ArtifactError> {
        let document: XgbDocument = serde_json::from_str(text)?;
        let learner = document.learner;

        if learner.objective.name != "binary:logistic" {
            return Err(ArtifactError::Unsupported(format!(
                "objective '{}' (only binary:logistic is supported)",
                learner.objective.name
            )));
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(ArtifactError::Unsupported(format!(
                "booster '{}' (only gbtree is supported)",
                learner.gradient_booster.name
            )));
        }

        let params = &learner.learner_model_param;
        let num_class = params
            .num_class
            .as_deref()
            .map(parse_param)
            .transpose()?
            .unwrap_or(0.0);
        if num_class > 1.0 {
            return Err(ArtifactError::Unsupported(format!(
                "{} classes (only binary models are supported)",
                num_class
            )));
        }

        let feature_names = if learner.feature_names.is_empty() {
            None
        } else {
            Some(learner.feature_names)
        };
        let num_features = match (&params.num_feature, &feature_names) {
            (Some(n), _) => parse_param(n)? as usize,
            (None, Some(names)) => names.len(),
            (None, None) => {
                return Err(ArtifactError::Parse("model does not declare num_feature".into()))
            }
        };
        if let Some(names) = &feature_names {
            if names.len() != num_features {
                return Err(ArtifactError::Parse(format!(
                    "model declares {} features but names {}",
                    num_features,
                    names.len()
                )));
            }
        }

        let base_score = parse_param(&params.base_score)? as f32;
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(ArtifactError::Parse(format!(
                "base_score {} is not a probability",
                base_score
            )));
        }

        let tree_model = learner
            .gradient_booster
            .model
            .ok_or_else(|| ArtifactError::Parse("gbtree booster has no model".into()))?;
        if tree_model.tree_info.iter().any(|&group| group != 0) {
            return Err(ArtifactError::Unsupported("trees for more than one output group".into()));
        }
        if tree_model.trees.is_empty() {
            return Err(ArtifactError::Parse("model contains no trees".into()));
        }

        let trees = tree_model
            .trees
            .into_iter()
            .enumerate()
            .map(|(id, tree)| Tree::from_xgb(tree, id, num_features))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            base_margin: logit(base_score),
            num_features,
            feature_names,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw additive score before the logistic link.
    pub fn margin(&self, features: &[f32]) -> f32 {
        self.trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(features))
    }

    fn feature_name(&self, index: usize) -> String {
        self.feature_names
            .as_ref()
            .and_then(|names| names.get(index).cloned())
            .unwrap_or_else(|| format!("f{}", index))
    }
}

/// Parses a learner parameter. Recent XGBoost versions wrap scalars in brackets (`"[5E-1]"`).
fn parse_param(raw: &str) -> Result<f64, ArtifactError> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .parse::<f64>()
        .map_err(|_| ArtifactError::Parse(format!("invalid numeric parameter '{}'", raw)))
}

impl ChurnModel for TreeEnsembleModel {
    fn kind(&self) -> ModelKind {
        ModelKind::XgboostJson
    }

    fn num_features(&self) -> Option<usize> {
        Some(self.num_features)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 2], ChurnError> {
        if features.len() != self.num_features {
            return Err(ChurnError::ModelInferenceError(format!(
                "Model expects {} features, got {}",
                self.num_features,
                features.len()
            )));
        }
        let values = features.to_vec();
        let churn = sigmoid(self.margin(&values));
        Ok([1.0 - churn, churn])
    }

    fn feature_importance(&self, kind: ImportanceKind) -> Option<Vec<FeatureImportance>> {
        let mut totals: HashMap<usize, (f64, usize)> = HashMap::new();
        for tree in &self.trees {
            for (feature, gain) in tree.splits() {
                let entry = totals.entry(feature).or_insert((0.0, 0));
                entry.0 += gain as f64;
                entry.1 += 1;
            }
        }

        let mut scores: Vec<FeatureImportance> = totals
            .into_iter()
            .map(|(feature, (total_gain, weight))| {
                let score = match kind {
                    ImportanceKind::Gain => total_gain / weight as f64,
                    ImportanceKind::TotalGain => total_gain,
                    ImportanceKind::Weight => weight as f64,
                };
                FeatureImportance {
                    feature: self.feature_name(feature),
                    score,
                }
            })
            .collect();
        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        Some(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../../tests/fixtures/xgb_model.json");

    fn customer(age: f32, active: f32, balance: f32) -> FeatureVector {
        FeatureVector::from_values(vec![
            650.0, 1.0, age, 3.0, balance, 2.0, 1.0, active, 60_000.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ])
    }

    #[test]
    fn test_loads_fixture() {
        let model = TreeEnsembleModel::from_json_str(FIXTURE).unwrap();
        assert_eq!(model.num_trees(), 3);
        assert_eq!(model.num_features(), Some(14));
        assert_eq!(model.feature_names().unwrap()[2], "Age");
        assert_eq!(model.kind(), ModelKind::XgboostJson);
    }

    #[test]
    fn test_margin_sums_leaves_over_base_score() {
        let model = TreeEnsembleModel::from_json_str(FIXTURE).unwrap();
        // base_score 0.5 contributes a zero margin
        let margin = model.margin(&customer(40.0, 1.0, 50_000.0).to_vec());
        assert!((margin - (-0.4 - 0.3 - 0.05)).abs() < 1e-6);

        let margin = model.margin(&customer(60.0, 0.0, 50_000.0).to_vec());
        assert!((margin - (0.6 + 0.5 - 0.05)).abs() < 1e-6);

        let margin = model.margin(&customer(25.0, 0.0, 0.0).to_vec());
        assert!((margin - (-0.4 + 0.1 + 0.05)).abs() < 1e-6);
    }

    #[test]
    fn test_split_condition_is_strictly_less_than() {
        let model = TreeEnsembleModel::from_json_str(FIXTURE).unwrap();
        // Age 45 is not below 45, so tree 0 goes right
        let margin = model.margin(&customer(45.0, 1.0, 50_000.0).to_vec());
        assert!((margin - (0.6 - 0.3 - 0.05)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_values_follow_default_direction() {
        let model = TreeEnsembleModel::from_json_str(FIXTURE).unwrap();
        // tree 0 and tree 2 default left on Age, tree 1 defaults right on activity
        let margin = model.margin(&customer(f32::NAN, f32::NAN, 50_000.0).to_vec());
        assert!((margin - (-0.4 - 0.3 + 0.05)).abs() < 1e-6);
    }

    #[test]
    fn test_predict_proba_and_label() {
        let model = TreeEnsembleModel::from_json_str(FIXTURE).unwrap();
        let [stay, churn] = model.predict_proba(&customer(60.0, 0.0, 50_000.0)).unwrap();
        assert!((churn - sigmoid(1.05)).abs() < 1e-6);
        assert!((stay + churn - 1.0).abs() < 1e-6);
        assert_eq!(
            model.predict(&customer(60.0, 0.0, 50_000.0)).unwrap(),
            super::super::model::ChurnLabel::Churned
        );
        assert_eq!(
            model.predict(&customer(40.0, 1.0, 50_000.0)).unwrap(),
            super::super::model::ChurnLabel::Stayed
        );
    }

    #[test]
    fn test_wrong_vector_length() {
        let model = TreeEnsembleModel::from_json_str(FIXTURE).unwrap();
        let short = FeatureVector::from_values(vec![0.0; 13]);
        assert!(matches!(
            model.predict_proba(&short),
            Err(ChurnError::ModelInferenceError(_))
        ));
    }

    #[test]
    fn test_gain_importance() {
        let model = TreeEnsembleModel::from_json_str(FIXTURE).unwrap();

        let gain = model.feature_importance(ImportanceKind::Gain).unwrap();
        let names: Vec<&str> = gain.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(names, vec!["Age", "IsActiveMember", "Balance"]);
        assert!((gain[0].score - 9.0).abs() < 1e-9);
        assert!((gain[1].score - 8.0).abs() < 1e-9);

        let total = model.feature_importance(ImportanceKind::TotalGain).unwrap();
        assert_eq!(total[0].feature, "Age");
        assert!((total[0].score - 18.0).abs() < 1e-9);

        let weight = model.feature_importance(ImportanceKind::Weight).unwrap();
        assert_eq!(weight[0].feature, "Age");
        assert_eq!(weight[0].score, 2.0);
    }

    #[test]
    fn test_bracketed_base_score() {
        let text = FIXTURE.replace("\"5E-1\"", "\"[7.5E-1]\"");
        let model = TreeEnsembleModel::from_json_str(&text).unwrap();
        let margin = model.margin(&customer(40.0, 1.0, 50_000.0).to_vec());
        assert!((margin - (logit(0.75) - 0.75)).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_unsupported_objective() {
        let text = FIXTURE.replace("binary:logistic", "reg:squarederror");
        assert!(matches!(
            TreeEnsembleModel::from_json_str(&text),
            Err(ArtifactError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_split_on_unknown_feature() {
        let text = FIXTURE.replace("\"split_indices\": [7, 4, 0, 0, 0]", "\"split_indices\": [20, 4, 0, 0, 0]");
        assert!(matches!(
            TreeEnsembleModel::from_json_str(&text),
            Err(ArtifactError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(TreeEnsembleModel::from_json_str("not json").is_err());
        assert!(matches!(
            TreeEnsembleModel::from_json_file("/nonexistent/xgb_model.json"),
            Err(ArtifactError::NotFound(_))
        ));
    }
}
