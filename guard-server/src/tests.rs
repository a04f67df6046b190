use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use guard_core::{
    CatBoostClassifier, EncoderStore, FeatureNames, ForestSpec, GuardPredictor, ModelEnsemble, ObliviousSpec,
    PredictorContext, XgBoostClassifier,
};
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

use super::*;
use crate::config::Config;

fn predictor(with_models: bool) -> GuardPredictor {
    let mut models = ModelEnsemble::new(3);
    if with_models {
        let forest: ForestSpec = serde_json::from_value(json!({
            "num_classes": 3,
            "trees": [
                {"class": 0, "nodes": [
                    {"feature": 2, "threshold": 8.0, "left": 1, "right": 2, "gain": 2.0},
                    {"leaf": 1.0},
                    {"leaf": -1.0}
                ]},
                {"class": 1, "nodes": [{"leaf": 0.2}]},
                {"class": 2, "nodes": [
                    {"feature": 37, "threshold": 12.0, "left": 1, "right": 2, "gain": 1.0},
                    {"leaf": -0.3},
                    {"leaf": 0.6}
                ]}
            ]
        }))
        .unwrap();
        let oblivious: ObliviousSpec = serde_json::from_value(json!({
            "num_classes": 3,
            "trees": [
                {"splits": [{"feature": 2, "border": 5.0}], "leaf_values": [[0.5, 0.0, 0.1], [0.0, 0.7, 0.1]]}
            ]
        }))
        .unwrap();
        models.register("xgboost", Arc::new(XgBoostClassifier::from_spec(forest).unwrap())).unwrap();
        models.register("catboost", Arc::new(CatBoostClassifier::from_spec(oblivious).unwrap())).unwrap();
    }
    GuardPredictor::new(PredictorContext::new(FeatureNames::default(), EncoderStore::new(), models))
}

fn app(with_models: bool) -> Router {
    let config = Config::from_lookup(|key| match key {
        "NUM_CLASSES" => Some("3".to_string()),
        "MAX_TOP_K" => Some("5".to_string()),
        "DEFAULT_TOP_K" => Some("2".to_string()),
        _ => None,
    });
    create_router(AppState {
        predictor: Arc::new(predictor(with_models)),
        config,
    })
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = assert_ok!(axum::body::to_bytes(response.into_body(), usize::MAX).await);
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_reports_loaded_models() {
    let (status, body) = send(app(true), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models_loaded"], json!(["catboost", "ensemble", "xgboost"]));
    assert_eq!(body["guard_directory"], false);

    let (_, body) = send(app(false), "GET", "/health", None).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_models_listing() {
    let (status, body) = send(app(true), "GET", "/api/v1/models", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default_model"], "ensemble");
    assert_eq!(body["models"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_predict_defaults_and_shape() {
    let request = json!({ "observation": { "exit_country": "DE", "bandwidth": 7.5 } });
    let (status, body) = send(app(true), "POST", "/api/v1/predict", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_used"], "ensemble");
    assert_eq!(body["top_k"], 2);
    assert_eq!(body["total_guards"], 3);
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0]["rank"], 1);
    let sum: f64 = predictions.iter().map(|p| p["confidence"].as_f64().unwrap()).sum();
    assert!((sum - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_predict_errors() {
    let (status, body) = send(
        app(true),
        "POST",
        "/api/v1/predict",
        Some(json!({ "observation": {}, "model_id": "foo" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("xgboost"));
    assert_eq!(body["status"], 404);

    let (status, _) = send(app(true), "POST", "/api/v1/predict", Some(json!({ "top_k": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app(true), "POST", "/api/v1/predict", Some(json!({ "top_k": 6 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // ensemble with no constituents
    let (status, body) = send(app(false), "POST", "/api/v1/predict", Some(json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
}

#[tokio::test]
async fn test_explain_endpoint() {
    let request = json!({ "observation": { "bandwidth": 9.0 }, "guard_index": 2, "model_id": "xgboost" });
    let (status, body) = send(app(true), "POST", "/api/v1/explain", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guard_index"], 2);
    assert_eq!(body["attributions"].as_array().unwrap().len(), 75);
    assert!(body["explanation"].as_str().unwrap().starts_with("This guard (Guard_002)"));

    let request = json!({ "observation": {}, "guard_index": 3, "model_id": "xgboost" });
    let (status, _) = send(app(true), "POST", "/api/v1/explain", Some(request)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feature_importance_endpoint() {
    let (status, body) = send(app(true), "GET", "/api/v1/feature-importance/xgboost", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["features"][0]["rank"], 1);
    assert_eq!(body["features"][0]["feature_name"], "exit_bandwidth");

    let (status, body) = send(app(true), "GET", "/api/v1/feature-importance/catboost", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);

    let (status, _) = send(app(true), "GET", "/api/v1/feature-importance/foo", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_counterfactual_endpoints() {
    let request = json!({
        "original_input": { "bandwidth": 7.5, "exit_country": "DE" },
        "modified_features": { "bandwidth": 10.0, "exit_country": "US" },
        "model_id": "xgboost"
    });
    let (status, body) = send(app(true), "POST", "/api/v1/counterfactual", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    let changed = body["original"]["predictions"][0]["guard_index"] != body["modified"]["predictions"][0]["guard_index"];
    assert_eq!(body["comparison"]["top_guard_changed"], changed);
    assert_eq!(body["sensitivity"]["feature_sensitivities"].as_array().unwrap().len(), 2);

    let request = json!({
        "observation": {},
        "feature": "bandwidth",
        "low": 1.0,
        "high": 20.0,
        "model_id": "xgboost",
        "steps": 30
    });
    let (status, body) = send(app(true), "POST", "/api/v1/counterfactual/threshold", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    let threshold = body["threshold"].as_f64().unwrap();
    assert!((threshold - 8.0).abs() < 1e-6, "{}", threshold);

    let request = json!({ "feature": "bandwidth", "low": 5.0, "high": 1.0 });
    let (status, _) = send(app(true), "POST", "/api/v1/counterfactual/threshold", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
