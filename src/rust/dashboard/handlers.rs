//! HTTP request handlers

use std::collections::HashMap;
use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Form, Query, State},
    response::Html,
    Json,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::charts::DashboardCharts;
use super::error::{Result, ServerError};
use super::page::{render_page, PageContext, PredictionOutcome};
use super::state::{AppState, IMPORTANCE_TOP};
use crate::dataset::{ChurnSummary, DatasetFilter};
use crate::features::RawCustomerInput;
use crate::predictor::{ChurnError, ChurnLabel, FeatureImportance, ImportanceKind};

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub gender: Option<String>,
    pub geography: Option<String>,
}

impl FilterQuery {
    fn resolve(&self, state: &AppState) -> std::result::Result<DatasetFilter, ChurnError> {
        DatasetFilter::parse(
            self.gender.as_deref().unwrap_or(""),
            self.geography.as_deref().unwrap_or(""),
            &state.dataset,
        )
    }
}

fn render(
    state: &AppState,
    filter: &DatasetFilter,
    form: &RawCustomerInput,
    outcome: Option<&PredictionOutcome>,
) -> Result<Html<String>> {
    let view = state.dataset.filter(filter);
    let summary = ChurnSummary::from_dataset(&view);
    let charts = DashboardCharts::render(&summary, state.importance.as_deref())?;
    let geographies = state.dataset.geographies();

    Ok(Html(render_page(&PageContext {
        filter,
        geographies: &geographies,
        summary: &summary,
        charts: &charts,
        form,
        outcome,
    })))
}

// ============================================================================
// Page Handlers
// ============================================================================

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Html<String>> {
    let filter = query.resolve(&state)?;
    render(&state, &filter, &RawCustomerInput::default(), None)
}

/// Handles the prediction form. Rejected input is shown on the page, never as an error status.
/// An unusable filter falls back to the unfiltered view.
pub async fn predict_form(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Html<String>> {
    let filter = query.resolve(&state).unwrap_or_else(|e| {
        warn!("Ignoring filter on prediction form, showing all customers: {}", e);
        DatasetFilter::all()
    });

    let (form, outcome) = match RawCustomerInput::from_form(&fields) {
        Ok(raw) => {
            let outcome = match state.predictor.predict(&raw) {
                Ok(result) => {
                    info!(
                        "Form prediction: {} ({})",
                        result.label,
                        result.probability_percent()
                    );
                    PredictionOutcome::Predicted(result)
                }
                Err(ChurnError::ValidationError(msg)) => PredictionOutcome::Rejected(msg),
                Err(e) => {
                    error!("Form prediction failed: {}", e);
                    PredictionOutcome::Failed
                }
            };
            (raw, outcome)
        }
        Err(e) => {
            warn!("Rejected prediction form: {}", e);
            let message = match e {
                ChurnError::ValidationError(msg) => msg,
                other => other.to_string(),
            };
            (RawCustomerInput::default(), PredictionOutcome::Rejected(message))
        }
    };

    render(&state, &filter, &form, Some(&outcome))
}

// ============================================================================
// API Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let info = state.predictor.info();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "customers": state.dataset.len(),
        "model": info.model_kind.to_string(),
        "num_features": info.num_features,
    }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub gender: &'static str,
    pub geography: &'static str,
    pub summary: ChurnSummary,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<StatsResponse>> {
    let filter = query.resolve(&state)?;
    let summary = ChurnSummary::from_dataset(&state.dataset.filter(&filter));
    Ok(Json(StatsResponse {
        gender: filter.gender_label(),
        geography: filter.geography_label(),
        summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: ChurnLabel,
    /// Model class: 1 for churned, 0 for stayed
    pub class: u8,
    pub churned: bool,
    pub churn_probability: f32,
    pub stay_probability: f32,
    pub probability_percent: String,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RawCustomerInput>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(raw) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let result = state.predictor.predict(&raw)?;
    Ok(Json(PredictResponse {
        label: result.label,
        class: result.label.class(),
        churned: result.label == ChurnLabel::Churned,
        churn_probability: result.churn_probability,
        stay_probability: result.stay_probability(),
        probability_percent: result.probability_percent(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ImportanceQuery {
    pub kind: Option<String>,
    pub top: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ImportanceResponse {
    pub kind: &'static str,
    pub features: Vec<FeatureImportance>,
}

pub async fn get_importance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportanceQuery>,
) -> Result<Json<ImportanceResponse>> {
    let kind = match query.kind.as_deref() {
        Some(kind) => kind.parse::<ImportanceKind>()?,
        None => ImportanceKind::Gain,
    };
    let top = query.top.unwrap_or(IMPORTANCE_TOP);
    let features = state.predictor.feature_importance(kind, top).ok_or_else(|| {
        ServerError::NotFound("The loaded model does not record feature importance".to_string())
    })?;
    Ok(Json(ImportanceResponse {
        kind: kind.as_str(),
        features,
    }))
}
