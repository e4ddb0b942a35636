use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use judol_core::model::{Activation, LayerSpec};
use judol_core::{EncodedBatch, ModelArtifact, PipelineConfig, Scorer, ScoringEngine, Threshold};
use judol_server::{build_app, AppSettings};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";

fn build_fixture(dir: &std::path::Path) -> PipelineConfig {
    let word_index = json!({"<OOV>": 1, "gacor": 2, "slot": 3, "bola": 4});
    let tokenizer = json!({
        "class_name": "Tokenizer",
        "config": { "oov_token": "<OOV>", "word_index": word_index.to_string() }
    });
    std::fs::write(dir.join("tokenizer.json"), tokenizer.to_string()).unwrap();
    std::fs::write(dir.join("kamus_slang.json"), r#"{"gcr": "gacor"}"#).unwrap();

    let model = ModelArtifact {
        name: None,
        input_length: Some(50),
        layers: vec![
            LayerSpec::Embedding {
                weights: vec![vec![0.0], vec![0.0], vec![3.0], vec![3.0], vec![-3.0]],
                mask_zero: true,
            },
            LayerSpec::GlobalAveragePooling1d,
            LayerSpec::Dense { kernel: vec![vec![2.0]], bias: vec![-1.0], activation: Activation::Sigmoid },
        ],
    };
    model.save(dir.join("model 6.json")).unwrap();
    std::fs::write(dir.join("model 2.json"), "not json").unwrap();

    PipelineConfig {
        slang_path: dir.join("kamus_slang.json"),
        vocabulary_path: dir.join("tokenizer.json"),
        model_dir: dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

fn app() -> (TempDir, Router) {
    let (dir, _engine, router) = app_with_engine();
    (dir, router)
}

fn app_with_engine() -> (TempDir, Arc<ScoringEngine>, Router) {
    let dir = tempfile::tempdir().unwrap();
    let config = build_fixture(dir.path());
    let engine = Arc::new(ScoringEngine::from_config(&config).unwrap());
    let settings = AppSettings {
        model_dir: config.model_dir.clone(),
        threshold: Threshold::default(),
        admin_token: Some(TOKEN.into()),
        cors_allow_origin: None,
    };
    let router = build_app(engine.clone(), settings);
    (dir, engine, router)
}

/// Scores 0.9, but replaces itself with a 0.1 model mid-prediction.
struct HandsOver {
    engine: Arc<OnceLock<Arc<ScoringEngine>>>,
}

impl Scorer for HandsOver {
    fn predict(&self, batch: &EncodedBatch) -> anyhow::Result<Vec<f32>> {
        if let Some(engine) = self.engine.get() {
            engine.install("model 5", Arc::new(Fixed(0.1)));
        }
        Ok(vec![0.9; batch.nrows()])
    }
}

struct Fixed(f32);

impl Scorer for Fixed {
    fn predict(&self, batch: &EncodedBatch) -> anyhow::Result<Vec<f32>> {
        Ok(vec![self.0; batch.nrows()])
    }
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()));
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut req = Request::post(uri).header("content-type", "application/json");
    if let Some(t) = token {
        req = req.header("X-ADMIN-TOKEN", t);
    }
    req.body(Body::from(body.to_string())).unwrap()
}

async fn select(app: &Router, scenario: &str) -> (StatusCode, Value) {
    call(app, post("/model", json!({ "scenario": scenario }), Some(TOKEN))).await
}

#[tokio::test]
async fn health_and_scenarios() {
    let (_dir, app) = app();
    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, body) = call(&app, get("/scenarios")).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 12);
    let top = list.iter().find(|s| s["rank"] == 1).unwrap();
    assert_eq!(top["name"], "model 6");
    assert_eq!(top["available"], true);
    assert_eq!(list[0]["available"], false);
}

#[tokio::test]
async fn classify_before_model_is_conflict() {
    let (_dir, app) = app();
    let (status, _) = call(&app, post("/classify", json!({ "text": "slot gacor" }), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = call(&app, get("/model")).await;
    assert_eq!(body["model"], Value::Null);
}

#[tokio::test]
async fn model_switch_requires_token() {
    let (_dir, app) = app();
    let (status, _) = call(&app, post("/model", json!({ "scenario": "model 6" }), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, post("/model", json!({ "scenario": "model 6" }), Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = select(&app, "model 42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_switch_keeps_previous_model() {
    let (_dir, app) = app();
    let (status, body) = select(&app, "model 6").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "model 6");

    let (status, _) = select(&app, "model 2").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = select(&app, "model 3").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = call(&app, get("/model")).await;
    assert_eq!(body["model"], "model 6");
}

#[tokio::test]
async fn classify_labels_text() {
    let (_dir, app) = app();
    select(&app, "model 6").await;

    let (status, body) = call(&app, post("/classify", json!({ "text": "SLOT GCRRR!!" }), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "Judi Online");
    assert_eq!(body["processed_text"], "slot gacor");
    assert_eq!(body["model"], "model 6");

    let (_, body) = call(&app, post("/classify", json!({ "text": "nonton bola" }), None)).await;
    assert_eq!(body["label"], "Non-Judi Online");

    let (status, _) = call(&app, post("/classify", json!({ "text": "x", "threshold": 1.5 }), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_preserves_order_and_accepts_nulls() {
    let (_dir, app) = app();
    select(&app, "model 6").await;

    let texts = json!({ "texts": ["slot gacor", null, "bola", "gacor"] });
    let (status, body) = call(&app, post("/classify/batch", texts, None)).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    let labels: Vec<&str> = results.iter().map(|r| r["label"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["Judi Online", "Non-Judi Online", "Non-Judi Online", "Judi Online"]);

    let (status, body) = call(&app, post("/classify/batch", json!({ "texts": [] }), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn response_names_the_model_that_scored_it() {
    let (_dir, engine, app) = app_with_engine();
    let slot = Arc::new(OnceLock::new());
    assert!(slot.set(engine.clone()).is_ok());

    engine.install("model 6", Arc::new(HandsOver { engine: slot.clone() }));
    let (status, body) = call(&app, post("/classify", json!({ "text": "slot gacor" }), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "model 6");
    assert_eq!(body["label"], "Judi Online");
    assert_eq!(engine.active_model().as_deref(), Some("model 5"));

    engine.install("model 6", Arc::new(HandsOver { engine: slot.clone() }));
    let (status, body) = call(&app, post("/classify/batch", json!({ "texts": ["slot", "bola"] }), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "model 6");
    assert_eq!(body["results"][1]["label"], "Judi Online");

    let (_, body) = call(&app, post("/classify", json!({ "text": "slot" }), None)).await;
    assert_eq!(body["model"], "model 5");
    assert_eq!(body["label"], "Non-Judi Online");
}
