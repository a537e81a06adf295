use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};
use log;

pub const DATASET_FILE: &str = "churn_dashboard_data.csv";
/// Model file names tried in order when no explicit model path is configured.
pub const MODEL_FILES: [&str; 2] = ["xgb_model.json", "xgb_model.onnx"];

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Malformed artifact: {0}")]
    Parse(String),
    #[error("Unsupported artifact: {0}")]
    Unsupported(String),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Locates the dataset and model artifacts and verifies their digests.
#[derive(Clone, Debug)]
pub struct ArtifactManager {
    artifacts_dir: PathBuf,
}

impl ArtifactManager {
    /// Creates a new ArtifactManager with the default artifacts directory
    pub fn new_default() -> Self {
        Self::new(Self::get_default_artifacts_dir())
    }

    /// Returns the default artifacts directory path
    pub fn get_default_artifacts_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("CHURNBOARD_HOME") {
            return PathBuf::from(path);
        }

        // 2. A project directory next to the working directory, as the dashboard was shipped
        let project_dir = PathBuf::from("Customer_Churn_Project");
        if project_dir.is_dir() {
            return project_dir;
        }

        // 3. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("churnboard");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("churnboard")
    }

    pub fn new<P: AsRef<Path>>(artifacts_dir: P) -> Self {
        Self {
            artifacts_dir: artifacts_dir.as_ref().to_path_buf(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn get_dataset_path(&self) -> PathBuf {
        self.artifacts_dir.join(DATASET_FILE)
    }

    /// Returns the first model file that exists, or the preferred name if none does.
    pub fn get_model_path(&self) -> PathBuf {
        MODEL_FILES
            .iter()
            .map(|name| self.artifacts_dir.join(name))
            .find(|path| path.exists())
            .unwrap_or_else(|| self.artifacts_dir.join(MODEL_FILES[0]))
    }

    /// Computes the SHA-256 digest of a file as lowercase hex.
    pub fn sha256_file(path: &Path) -> Result<String, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.display().to_string()));
        }
        let bytes = fs::read(path)?;
        log::debug!("Read {} bytes from {:?}", bytes.len(), path);
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Checks that an artifact exists and, when a digest is configured, that it matches.
    pub fn ensure_verified(
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ArtifactError> {
        if !path.exists() {
            log::error!("{} file not found at {:?}", file_type, path);
            return Err(ArtifactError::NotFound(path.display().to_string()));
        }
        let Some(expected) = expected_hash else {
            return Ok(());
        };

        let actual = Self::sha256_file(path)?;
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            log::error!("{} hash mismatch: expected {}, got {}", file_type, expected, actual);
            return Err(ArtifactError::HashMismatch {
                file_type: file_type.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        log::info!("{} file verified successfully", file_type);
        Ok(())
    }
}
