//! A customer churn dashboard and a thread-safe churn predictor backed by a
//! pre-trained gradient-boosted classifier.
//!
//! The core is the feature pipeline: raw customer fields are validated, encoded
//! into the 14 model features in training order, checked against a named schema
//! and scored. Models load from ONNX (through ONNX Runtime) or from an XGBoost
//! JSON dump (evaluated natively).
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use churnboard::{ChurnPredictor, RawCustomerInput};
//!
//! let predictor = ChurnPredictor::builder()
//!     .with_model_file("Customer_Churn_Project/xgb_model.json")?
//!     .build()?;
//!
//! let customer = RawCustomerInput {
//!     age: 55,
//!     is_active_member: "No".to_string(),
//!     geography: "Germany".to_string(),
//!     ..RawCustomerInput::default()
//! };
//! let result = predictor.predict(&customer)?;
//! println!("{} ({})", result.label, result.probability_percent());
//! # Ok(())
//! # }
//! ```
//!
//! # Dashboard Statistics
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use churnboard::{load_csv, ChurnSummary, DatasetFilter, Gender};
//!
//! let dataset = load_csv("Customer_Churn_Project/churn_dashboard_data.csv")?;
//! let view = dataset.filter(&DatasetFilter::new(Some(Gender::Female), None));
//! let summary = ChurnSummary::from_dataset(&view);
//! for group in &summary.by_geography {
//!     println!("{}: {:.1}%", group.label, group.rate * 100.0);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `ChurnPredictor` is `Send + Sync` and cheap to clone; the dashboard shares one
//! instance across all request handlers through `Arc<AppState>`.

pub mod artifact_manager;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod features;
pub mod predictor;
mod runtime;

pub use artifact_manager::{ArtifactError, ArtifactManager};
pub use config::DashboardConfig;
pub use dashboard::{create_router, run_server, AppState, ServerError};
pub use dataset::{load_csv, ChurnDataset, ChurnSummary, CustomerRecord, DatasetFilter, GroupRate};
pub use features::{
    AgeGroup, CustomerInput, FeatureEncoder, FeatureSchema, FeatureVector, Gender, Geography,
    RawCustomerInput, CHURN_FEATURES,
};
pub use predictor::{
    load_model, ChurnError, ChurnLabel, ChurnModel, ChurnPredictor, FeatureImportance,
    ImportanceKind, ModelKind, PredictionResult, PredictorBuilder, PredictorInfo,
};
pub use runtime::{create_session_builder, parse_optimization_level, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
