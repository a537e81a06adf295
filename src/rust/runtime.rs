use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use std::sync::OnceLock;

use crate::predictor::ChurnError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// ONNX Runtime settings used when an `.onnx` churn model is loaded.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 1, // A single row per request gains nothing from more
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

/// Parses an optimisation level as given on the command line (`0`-`3` or `disable`).
pub fn parse_optimization_level(value: &str) -> Result<GraphOptimizationLevel, ChurnError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "0" | "disable" => Ok(GraphOptimizationLevel::Disable),
        "1" => Ok(GraphOptimizationLevel::Level1),
        "2" => Ok(GraphOptimizationLevel::Level2),
        "3" => Ok(GraphOptimizationLevel::Level3),
        _ => Err(ChurnError::ValidationError(format!(
            "Optimization level '{}' must be 0-3 or 'disable'",
            value
        ))),
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("churnboard")
        .commit()?;
    Ok(())
}

pub fn ensure_initialized() -> Result<(), ChurnError> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| ChurnError::DataLoadError(format!("Failed to initialize ONNX Runtime: {}", e)))
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ChurnError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_initialization() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok()); // Second call should be fine
    }

    #[test]
    fn test_session_builder_config() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: GraphOptimizationLevel::Level1,
        };
        let builder = create_session_builder(&config);
        assert!(builder.is_ok());
    }

    #[test]
    fn test_parse_optimization_level() {
        assert!(matches!(parse_optimization_level("disable"), Ok(GraphOptimizationLevel::Disable)));
        assert!(matches!(parse_optimization_level("2"), Ok(GraphOptimizationLevel::Level2)));
        assert!(parse_optimization_level("fast").is_err());
    }
}
