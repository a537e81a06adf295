//! Application state shared across handlers

use log::info;

use crate::artifact_manager::ArtifactManager;
use crate::config::DashboardConfig;
use crate::dataset::{load_csv, ChurnDataset};
use crate::predictor::{ChurnError, ChurnPredictor, FeatureImportance, ImportanceKind};

/// Number of features shown on the importance chart.
pub const IMPORTANCE_TOP: usize = 10;

/// Everything a request needs. Built once at startup and never mutated.
#[derive(Debug)]
pub struct AppState {
    pub config: DashboardConfig,
    pub dataset: ChurnDataset,
    pub predictor: ChurnPredictor,
    /// Top features by gain, when the model format records split statistics
    pub importance: Option<Vec<FeatureImportance>>,
}

impl AppState {
    pub fn new(config: DashboardConfig, dataset: ChurnDataset, predictor: ChurnPredictor) -> Self {
        let importance = predictor.feature_importance(ImportanceKind::Gain, IMPORTANCE_TOP);
        Self {
            config,
            dataset,
            predictor,
            importance,
        }
    }

    /// Verifies and loads the dataset and the model named by the configuration.
    pub fn load(config: DashboardConfig) -> Result<Self, ChurnError> {
        ArtifactManager::ensure_verified(&config.data_path, config.data_sha256.as_deref(), "dataset")?;
        ArtifactManager::ensure_verified(&config.model_path, config.model_sha256.as_deref(), "model")?;

        let dataset = load_csv(&config.data_path)?;
        let predictor = ChurnPredictor::builder()
            .with_runtime_config(config.runtime.clone())
            .with_model_file(&config.model_path)?
            .build()?;

        info!(
            "Dashboard state ready: {} customers, {} model",
            dataset.len(),
            predictor.info().model_kind
        );
        Ok(Self::new(config, dataset, predictor))
    }
}
