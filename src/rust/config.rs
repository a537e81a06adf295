use std::env;
use std::path::PathBuf;

use crate::artifact_manager::ArtifactManager;
use crate::predictor::ChurnError;
use crate::runtime::RuntimeConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8501;

/// Where the dashboard finds its artifacts and where it listens.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    /// Expected SHA-256 of the dataset, checked at startup when set
    pub data_sha256: Option<String>,
    /// Expected SHA-256 of the model artifact, checked at startup when set
    pub model_sha256: Option<String>,
    pub host: String,
    pub port: u16,
    pub runtime: RuntimeConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::for_artifacts(&ArtifactManager::new_default())
    }
}

impl DashboardConfig {
    /// Defaults pointing into the given artifacts directory.
    pub fn for_artifacts(manager: &ArtifactManager) -> Self {
        Self {
            data_path: manager.get_dataset_path(),
            model_path: manager.get_model_path(),
            data_sha256: None,
            model_sha256: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            runtime: RuntimeConfig::default(),
        }
    }

    /// Defaults overridden by the `CHURNBOARD_*` environment variables.
    pub fn from_env() -> Result<Self, ChurnError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChurnError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let manager = match lookup("CHURNBOARD_HOME") {
            Some(home) => ArtifactManager::new(home),
            None => ArtifactManager::new_default(),
        };
        let mut config = Self::for_artifacts(&manager);

        if let Some(path) = lookup("CHURNBOARD_DATA") {
            config.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CHURNBOARD_MODEL") {
            config.model_path = PathBuf::from(path);
        }
        config.data_sha256 = lookup("CHURNBOARD_DATA_SHA256").filter(|s| !s.trim().is_empty());
        config.model_sha256 = lookup("CHURNBOARD_MODEL_SHA256").filter(|s| !s.trim().is_empty());
        if let Some(host) = lookup("CHURNBOARD_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("CHURNBOARD_PORT") {
            config.port = port.trim().parse().map_err(|_| {
                ChurnError::ValidationError(format!("CHURNBOARD_PORT '{}' is not a valid port", port))
            })?;
        }
        Ok(config)
    }

    pub fn with_data_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
