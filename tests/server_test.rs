//! Integration test: dashboard routes

use std::sync::Arc;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use churnboard::{
    create_router, load_csv, AppState, ArtifactManager, ChurnError, ChurnModel, ChurnPredictor,
    DashboardConfig, FeatureVector, ModelKind,
};
use env_logger::{Builder, Env};
use serde_json::{json, Value};
use tower::ServiceExt;

// Initialize test logger
fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

fn fixture_config() -> DashboardConfig {
    let manager = ArtifactManager::new(format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR")));
    DashboardConfig::for_artifacts(&manager)
}

fn test_app() -> Router {
    init();
    let state = AppState::load(fixture_config()).unwrap();
    create_router(Arc::new(state))
}

/// A model without split statistics whose inference can be made to fail.
#[derive(Debug)]
struct OpaqueModel {
    fail: bool,
}

impl ChurnModel for OpaqueModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Onnx
    }

    fn num_features(&self) -> Option<usize> {
        Some(14)
    }

    fn predict_proba(&self, _features: &FeatureVector) -> Result<[f32; 2], ChurnError> {
        if self.fail {
            Err(ChurnError::ModelInferenceError("session run failed".to_string()))
        } else {
            Ok([0.4, 0.6])
        }
    }
}

fn opaque_app(fail: bool) -> Router {
    init();
    let config = fixture_config();
    let dataset = load_csv(&config.data_path).unwrap();
    let predictor = ChurnPredictor::builder()
        .with_model(Arc::new(OpaqueModel { fail }))
        .unwrap()
        .build()
        .unwrap();
    create_router(Arc::new(AppState::new(config, dataset, predictor)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn customer() -> Value {
    json!({
        "credit_score": 650,
        "age": 60,
        "tenure": 3,
        "balance": 50000.0,
        "num_products": 1,
        "has_cr_card": "Yes",
        "is_active_member": "No",
        "estimated_salary": 80000.0,
        "geography": "Germany",
        "gender": "Female"
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = send(test_app(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["customers"], 20);
    assert_eq!(json["model"], "xgboost-json");
}

#[tokio::test]
async fn test_root_serves_dashboard() {
    let (status, body) = send(test_app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Customer Churn Dashboard"));
    assert!(body.contains("<svg"));
    assert!(body.contains("Churn Rate by Age Group"));
    assert!(body.contains("Feature Importance (XGBoost)"));
    assert!(body.contains("name=\"credit_score\" value=\"650\""));
}

#[tokio::test]
async fn test_root_with_filters() {
    let (status, body) = send(test_app(), get("/?gender=Male&geography=Germany")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("2 customers in view"));

    let (status, _) = send(test_app(), get("/?gender=Robot")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let (status, body) = send(test_app(), get("/api/stats?geography=Germany")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["gender"], "All");
    assert_eq!(json["geography"], "Germany");
    assert_eq!(json["summary"]["total"], 3);
    assert_eq!(json["summary"]["churned"], 2);
}

#[tokio::test]
async fn test_api_predict() {
    let (status, body) = send(test_app(), post_json("/api/predict", customer())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["label"], "Churned");
    assert_eq!(json["churned"], true);
    assert_eq!(json["class"], 1);
    assert_eq!(json["probability_percent"], "74.08%");
    let churn = json["churn_probability"].as_f64().unwrap();
    let stay = json["stay_probability"].as_f64().unwrap();
    assert!((churn + stay - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_api_predict_validation_failures() {
    let mut young = customer();
    young["age"] = json!(12);
    let (status, body) = send(test_app(), post_json("/api/predict", young)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], true);
    assert!(json["message"].as_str().unwrap().contains("Age"));

    let (status, _) = send(test_app(), post_json("/api/predict", json!({ "age": 40 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_predict_inference_failure_is_generic() {
    let (status, body) = send(opaque_app(true), post_json("/api/predict", customer())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("session run failed"));
}

#[tokio::test]
async fn test_form_prediction() {
    let form = "credit_score=650&age=60&tenure=3&balance=50000&num_products=1\
                &has_cr_card=Yes&is_active_member=No&estimated_salary=80000\
                &geography=Germany&gender=Female";
    let (status, body) = send(test_app(), post_form("/predict?gender=All&geography=All", form)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Churn Prediction:</strong> Churned"));
    assert!(body.contains("74.08%"));
    // The submitted values stay in the form
    assert!(body.contains("name=\"age\" value=\"60\""));
}

#[tokio::test]
async fn test_form_prediction_with_unknown_filter_shows_all_customers() {
    let (status, body) = send(test_app(), post_form("/predict?gender=Robot", "age=60")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("20 customers in view"));
    assert!(body.contains("Churn Prediction:</strong>"));
}

#[tokio::test]
async fn test_form_validation_failure_renders_message() {
    let (status, body) = send(test_app(), post_form("/predict", "age=abc")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
    assert!(body.contains("Age"));

    let (status, body) = send(test_app(), post_form("/predict", "age=101")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
}

#[tokio::test]
async fn test_importance_endpoint() {
    let (status, body) = send(test_app(), get("/api/importance")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["kind"], "gain");
    assert_eq!(json["features"][0]["feature"], "Age");

    let (status, _) = send(test_app(), get("/api/importance?kind=cover")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(opaque_app(false), get("/api/importance")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_opaque_model_page_has_no_importance_chart() {
    let (status, body) = send(opaque_app(false), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("Feature Importance (XGBoost)"));
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = send(test_app(), get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("\"error\":true"));

    let (status, _) = send(test_app(), get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
